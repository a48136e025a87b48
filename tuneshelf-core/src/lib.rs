//! Tuneshelf Core - Shared plumbing for the discovery client
//!
//! This crate provides the building blocks the search layer is assembled
//! from: replay-latest state channels, the cancellable fetch service with its
//! production and simulation transports, the catalog vocabulary shared by
//! sections and search, and configuration and tracing setup.

pub mod catalog;
pub mod channel;
pub mod config;
pub mod fetch;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use catalog::{Category, MediaType, SectionStyle};
pub use channel::{Observer, StateChannel};
pub use config::TuneshelfConfig;
pub use fetch::{
    FetchError, FetchErrorKind, FetchService, HttpResponse, HttpTransport, ReqwestTransport,
    ScriptedResponse, SimulatedTransport,
};
pub use tokio_util::sync::CancellationToken;

/// Errors that can surface from Tuneshelf outside a single unit of fetch work.
///
/// Per-fetch failures are normally recovered into state values; this type
/// covers setup problems and talking to a stopped orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum TuneshelfError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Search orchestrator has shut down")]
    OrchestratorShutdown,
}

impl TuneshelfError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            TuneshelfError::Fetch(e) => match e.kind() {
                FetchErrorKind::InvalidUrl => "The search address is not valid".to_string(),
                FetchErrorKind::TransportFailure => {
                    "Could not reach the search service".to_string()
                }
                FetchErrorKind::DecodeFailure => {
                    "The search service sent an unexpected response".to_string()
                }
                FetchErrorKind::Cancelled => "The request was cancelled".to_string(),
            },
            TuneshelfError::Configuration { reason } => format!("Configuration error: {reason}"),
            TuneshelfError::OrchestratorShutdown => "Search is no longer running".to_string(),
        }
    }

    /// Checks if this error is due to user-supplied input or settings.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TuneshelfError::Configuration { .. }
                | TuneshelfError::Fetch(FetchError::InvalidUrl { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, TuneshelfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let err = TuneshelfError::from(FetchError::TransportFailure {
            url: "https://example.com".to_string(),
            reason: "connection refused".to_string(),
            status: None,
        });
        assert_eq!(err.user_message(), "Could not reach the search service");
        assert!(!err.is_user_error());

        let err = TuneshelfError::Configuration {
            reason: "country must not be empty".to_string(),
        };
        assert!(err.is_user_error());
        assert!(err.user_message().contains("country"));
    }

    #[test]
    fn test_invalid_url_is_user_error() {
        let err = TuneshelfError::from(FetchError::InvalidUrl {
            url: "not a url".to_string(),
            reason: "relative URL without a base".to_string(),
        });
        assert!(err.is_user_error());
    }
}
