//! Production HTTP transport using reqwest

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{FetchError, HttpResponse, HttpTransport};

/// Production HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a new transport with the specified timeout and user agent.
    ///
    /// # Errors
    ///
    /// - `FetchError::TransportFailure` - If the underlying HTTP client cannot be built
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()
            .map_err(|e| FetchError::TransportFailure {
                url: String::new(),
                reason: format!("HTTP client creation failed: {e}"),
                status: None,
            })?;

        Ok(Self { client, timeout })
    }

    /// Returns current timeout setting
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else if e.is_connect() {
                    "failed to connect".to_string()
                } else if e.is_request() {
                    format!("invalid request: {e}")
                } else {
                    format!("HTTP request failed: {e}")
                };

                FetchError::TransportFailure {
                    url: url.to_string(),
                    reason,
                    status: None,
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::TransportFailure {
                url: url.to_string(),
                reason: format!("failed to read response body: {e}"),
                status: Some(status),
            })?
            .to_vec();

        tracing::trace!(%url, status, bytes = body.len(), "HTTP response received");

        Ok(HttpResponse::new(status, body))
    }
}
