//! Messages exchanged with the search actor.

use tokio::sync::oneshot;
use tuneshelf_core::{FetchError, MediaType};

use crate::Generation;
use crate::types::ResultSet;

/// Commands sent from `SearchOrchestrator` handles to the actor.
pub(crate) enum SearchCommand {
    /// Record new query text and restart the debounce window.
    Submit { query: String },
    /// Cancel in-flight work and stop the actor.
    Shutdown { responder: oneshot::Sender<()> },
}

/// Outcome of one generation's movie + podcast join, reported by its task.
pub(crate) struct JoinOutcome {
    pub generation: Generation,
    pub query: String,
    pub result: Result<(ResultSet, ResultSet), (MediaType, FetchError)>,
}
