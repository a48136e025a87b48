//! Tuneshelf Search - Home sections and incremental media search
//!
//! Two independent orchestrators share one injected `FetchService`:
//! the `SectionAggregator` loads a fixed set of home categories concurrently
//! with per-category failure isolation, and the `SearchOrchestrator` turns a
//! stream of submitted query text into debounced, cancellable, generation
//! tagged movie + podcast searches.

pub mod endpoint;
pub mod errors;
pub mod search;
pub mod sections;
pub mod types;

// Re-export main types
pub use endpoint::SearchEndpoint;
pub use errors::JoinFailure;
pub use search::{CombinedSearchState, PhaseUpdate, SearchOrchestrator, SearchPhase};
pub use sections::{SectionAggregator, SectionLoad, SectionState};
pub use types::{ResultItem, ResultSet, SearchPayload};

/// Monotonic version tag distinguishing successive fetch rounds.
pub type Generation = u64;
