//! Error types for search orchestration.

use thiserror::Error;
use tuneshelf_core::{FetchError, MediaType};

use crate::Generation;

/// A search generation whose movie/podcast join did not complete.
///
/// Published on the orchestrator's failure channel instead of a combined
/// result. Only the first failing sub-fetch is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Search generation {generation} for '{query}' failed on {media}: {source}")]
pub struct JoinFailure {
    /// Generation the failure belongs to
    pub generation: Generation,
    /// Query text of that generation
    pub query: String,
    /// Sub-fetch that failed
    pub media: MediaType,
    /// Underlying fetch error
    pub source: FetchError,
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_display_and_source() {
        let failure = JoinFailure {
            generation: 5,
            query: "rock".to_string(),
            media: MediaType::Podcast,
            source: FetchError::TransportFailure {
                url: "http://search.test".to_string(),
                reason: "reset".to_string(),
                status: None,
            },
        };

        let message = failure.to_string();
        assert!(message.starts_with("Search generation 5 for 'rock' failed on podcast"));
        assert!(failure.source().is_some());
    }
}
