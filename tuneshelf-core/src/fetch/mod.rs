//! Fetch service and transport abstraction
//!
//! `FetchService` performs exactly one GET per call and decodes the JSON body
//! into the caller's type. The network itself sits behind `HttpTransport` so
//! the same service runs against reqwest in production and against scripted
//! responses in simulation and tests.

pub mod production;
pub mod simulation;

use std::sync::Arc;

use async_trait::async_trait;
pub use production::ReqwestTransport;
use serde::de::DeserializeOwned;
pub use simulation::{ScriptedResponse, SimulatedTransport};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::EndpointConfig;

/// HTTP response abstraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status_code: u16,
    /// Response body bytes
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create new HTTP response with status code and body
    pub fn new(status_code: u16, body: Vec<u8>) -> Self {
        Self { status_code, body }
    }

    /// Create a 200 response carrying a JSON document.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::new(200, value.to_string().into_bytes())
    }

    /// Returns true if the HTTP status code indicates success (2xx).
    pub fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code < 300
    }
}

/// Network layer abstraction for HTTP GET requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Errors
    ///
    /// - `FetchError::TransportFailure` - Network or protocol level failure
    async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError>;
}

/// Errors produced by a single fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// URL was malformed; no network access happened.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network or HTTP level failure.
    #[error("Transport failure for '{url}': {reason}")]
    TransportFailure {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    /// Payload arrived but did not match the expected shape.
    #[error("Decode failure for '{url}': {reason}")]
    DecodeFailure { url: String, reason: String },

    /// The caller's cancellation token fired before a result was delivered.
    #[error("Fetch cancelled: {url}")]
    Cancelled { url: String },
}

/// Payload-free discriminant of `FetchError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    InvalidUrl,
    TransportFailure,
    DecodeFailure,
    Cancelled,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::InvalidUrl { .. } => FetchErrorKind::InvalidUrl,
            FetchError::TransportFailure { .. } => FetchErrorKind::TransportFailure,
            FetchError::DecodeFailure { .. } => FetchErrorKind::DecodeFailure,
            FetchError::Cancelled { .. } => FetchErrorKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled { .. })
    }

    /// The URL the failed request targeted.
    pub fn url(&self) -> &str {
        match self {
            FetchError::InvalidUrl { url, .. }
            | FetchError::TransportFailure { url, .. }
            | FetchError::DecodeFailure { url, .. }
            | FetchError::Cancelled { url } => url,
        }
    }
}

/// Stateless fetch-and-decode service shared by sections and search.
///
/// Never retries. Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct FetchService {
    transport: Arc<dyn HttpTransport>,
}

impl FetchService {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Creates a service backed by reqwest using the endpoint's timeout and user agent.
    ///
    /// # Errors
    ///
    /// - `FetchError::TransportFailure` - HTTP client could not be constructed
    pub fn production(config: &EndpointConfig) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(config.request_timeout, config.user_agent)?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Fetches `url` and decodes the body as JSON into `T`.
    ///
    /// Once `cancel` fires the call resolves to `FetchError::Cancelled` and
    /// never yields a decoded value or a transport error.
    ///
    /// # Errors
    ///
    /// - `FetchError::InvalidUrl` - URL malformed or not http(s)
    /// - `FetchError::TransportFailure` - Network failure or non-2xx status
    /// - `FetchError::DecodeFailure` - Body is not the expected JSON shape
    /// - `FetchError::Cancelled` - Token fired before completion
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<T, FetchError> {
        let parsed = parse_url(url)?;

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                url: url.to_string(),
            });
        }

        tracing::debug!(url, "Fetch started");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(url, "Fetch cancelled in flight");
                return Err(FetchError::Cancelled { url: url.to_string() });
            }
            response = self.transport.get(&parsed) => response,
        };

        let result = response.and_then(|response| decode(url, response));

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                url: url.to_string(),
            });
        }

        match &result {
            Ok(_) => tracing::debug!(url, "Fetch completed"),
            Err(e) => tracing::warn!(url, error = %e, "Fetch failed"),
        }

        result
    }
}

impl std::fmt::Debug for FetchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchService").finish_non_exhaustive()
    }
}

fn parse_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(parsed)
}

fn decode<T: DeserializeOwned>(url: &str, response: HttpResponse) -> Result<T, FetchError> {
    if !response.is_success() {
        return Err(FetchError::TransportFailure {
            url: url.to_string(),
            reason: format!("HTTP status {}", response.status_code),
            status: Some(response.status_code),
        });
    }

    serde_json::from_slice(&response.body).map_err(|e| FetchError::DecodeFailure {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        name: String,
    }

    const URL: &str = "http://search.test/search?term=a";

    fn service_with(transport: &Arc<SimulatedTransport>) -> FetchService {
        FetchService::new(transport.clone())
    }

    #[tokio::test]
    async fn test_fetch_decodes_payload() {
        let transport = Arc::new(SimulatedTransport::new());
        transport.add_json(URL, &json!({ "name": "ok" }));

        let payload: Payload = service_with(&transport)
            .fetch(URL, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(payload.name, "ok");
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_skips_network() {
        let transport = Arc::new(SimulatedTransport::new());
        let service = service_with(&transport);

        let err = service
            .fetch::<Payload>("::not a url::", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::InvalidUrl);

        let err = service
            .fetch::<Payload>("file:///etc/passwd", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::InvalidUrl);

        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_failure() {
        let transport = Arc::new(SimulatedTransport::new());
        transport.add_response(URL, HttpResponse::new(503, b"unavailable".to_vec()));

        let err = service_with(&transport)
            .fetch::<Payload>(URL, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::TransportFailure {
                status: Some(503),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_decode_failure() {
        let transport = Arc::new(SimulatedTransport::new());
        transport.add_json(URL, &json!({ "unexpected": true }));

        let err = service_with(&transport)
            .fetch::<Payload>(URL, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FetchErrorKind::DecodeFailure);
        assert_eq!(err.url(), URL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_preempts_slow_response() {
        let transport = Arc::new(SimulatedTransport::new());
        transport.add_scripted(
            URL,
            ScriptedResponse::ok(HttpResponse::json(&json!({ "name": "late" })))
                .with_latency(Duration::from_secs(5)),
        );

        let cancel = CancellationToken::new();
        let service = service_with(&transport);
        let fetch = tokio::spawn({
            let cancel = cancel.clone();
            async move { service.fetch::<Payload>(URL, &cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        let err = fetch.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_already_cancelled_token_skips_network() {
        let transport = Arc::new(SimulatedTransport::new());
        transport.add_json(URL, &json!({ "name": "never" }));

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service_with(&transport)
            .fetch::<Payload>(URL, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(transport.request_count(), 0);
    }
}
