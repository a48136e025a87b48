//! Simulation transport for deterministic testing and demo mode

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use super::{FetchError, HttpResponse, HttpTransport};

type Fallback = Arc<dyn Fn(&Url) -> ScriptedResponse + Send + Sync>;

/// Canned outcome for one URL.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    outcome: Result<HttpResponse, String>,
    latency: Option<Duration>,
}

impl ScriptedResponse {
    /// Respond with `response` after the transport's default latency.
    pub fn ok(response: HttpResponse) -> Self {
        Self {
            outcome: Ok(response),
            latency: None,
        }
    }

    /// Fail at the transport level with `reason`.
    pub fn transport_failure(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
            latency: None,
        }
    }

    /// Override the latency for this response only.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

/// Simulated transport with scripted per-URL responses.
///
/// Records every request it receives so tests can count network access,
/// and separately every request that ran to the end of its latency. A
/// request that was dropped mid-flight shows up only in the first log.
/// URLs without a script fall back to the configured responder, or 404.
pub struct SimulatedTransport {
    latency: Duration,
    responses: Mutex<HashMap<String, ScriptedResponse>>,
    fallback: Option<Fallback>,
    requests: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
}

impl SimulatedTransport {
    /// Creates a transport with no scripted responses and zero latency.
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            responses: Mutex::new(HashMap::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Sets the default latency applied to every response.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answers unscripted URLs with `responder` instead of 404.
    pub fn with_fallback<F>(mut self, responder: F) -> Self
    where
        F: Fn(&Url) -> ScriptedResponse + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(responder));
        self
    }

    /// Add a predefined response for a URL
    pub fn add_response(&self, url: &str, response: HttpResponse) {
        self.add_scripted(url, ScriptedResponse::ok(response));
    }

    /// Add a 200 JSON response for a URL
    pub fn add_json(&self, url: &str, value: &serde_json::Value) {
        self.add_response(url, HttpResponse::json(value));
    }

    /// Make requests to a URL fail at the transport level
    pub fn add_failure(&self, url: &str, reason: &str) {
        self.add_scripted(url, ScriptedResponse::transport_failure(reason));
    }

    pub fn add_scripted(&self, url: &str, response: ScriptedResponse) {
        self.responses.lock().insert(url.to_string(), response);
    }

    /// All URLs requested so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests whose URL contains `needle`.
    pub fn requests_containing(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|url| url.contains(needle))
            .count()
    }

    /// Number of answered requests whose URL contains `needle`.
    pub fn completed_containing(&self, needle: &str) -> usize {
        self.completed
            .lock()
            .iter()
            .filter(|url| url.contains(needle))
            .count()
    }

    fn script_for(&self, url: &Url) -> Option<ScriptedResponse> {
        if let Some(response) = self.responses.lock().get(url.as_str()) {
            return Some(response.clone());
        }
        self.fallback.as_ref().map(|responder| responder(url))
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for SimulatedTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
        self.requests.lock().push(url.to_string());

        let script = self.script_for(url);
        let latency = script
            .as_ref()
            .and_then(|s| s.latency)
            .unwrap_or(self.latency);

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.completed.lock().push(url.to_string());

        match script {
            Some(ScriptedResponse {
                outcome: Ok(response),
                ..
            }) => {
                tracing::debug!(
                    %url,
                    status = response.status_code,
                    "Simulation: scripted response"
                );
                Ok(response)
            }
            Some(ScriptedResponse {
                outcome: Err(reason),
                ..
            }) => {
                tracing::debug!(%url, reason = %reason, "Simulation: scripted transport failure");
                Err(FetchError::TransportFailure {
                    url: url.to_string(),
                    reason,
                    status: None,
                })
            }
            None => {
                tracing::debug!(%url, "Simulation: no response configured, returning 404");
                Ok(HttpResponse::new(404, b"Not Found".to_vec()))
            }
        }
    }
}
