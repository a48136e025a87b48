//! Debounced, cancellable incremental search
//!
//! The orchestrator runs as an actor: the handle forwards submitted query
//! text over a channel and a single task owns the debounce deadline, the
//! generation counter and the in-flight cancellation token. Each accepted
//! query fans out to a movie and a podcast fetch that are joined per
//! generation; only the current generation may publish.

mod actor;
mod commands;
mod handle;
mod state;

pub use handle::SearchOrchestrator;
pub use state::{CombinedSearchState, PhaseUpdate, SearchPhase};
