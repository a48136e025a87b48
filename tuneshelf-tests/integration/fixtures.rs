//! Shared builders for integration tests.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tuneshelf_core::{FetchService, HttpResponse, MediaType, ScriptedResponse, SimulatedTransport};
use tuneshelf_search::{SearchEndpoint, SearchOrchestrator};

pub const BASE_URL: &str = "http://search.test/search";
pub const DEBOUNCE: Duration = Duration::from_millis(300);

pub fn endpoint() -> SearchEndpoint {
    SearchEndpoint::new(BASE_URL, "KR")
}

pub fn url(term: &str, media: MediaType) -> String {
    endpoint().url_for(term, media)
}

/// Search payload with one renderable item per title.
pub fn payload(titles: &[&str]) -> serde_json::Value {
    let results: Vec<_> = titles
        .iter()
        .map(|title| {
            json!({
                "trackName": title,
                "artistName": "Various",
                "artworkUrl100": "https://img.test/100x100bb.jpg",
                "collectionName": "Collection"
            })
        })
        .collect();
    json!({ "results": results })
}

/// Transport that answers any URL with a single item named after its term.
pub fn echoing_transport() -> SimulatedTransport {
    SimulatedTransport::new().with_fallback(|url| {
        let term = url
            .query_pairs()
            .find(|(key, _)| key == "term")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        ScriptedResponse::ok(HttpResponse::json(&payload(&[term.as_str()])))
    })
}

/// Scripts a successful movie and podcast response for `term`.
pub fn script_success(transport: &SimulatedTransport, term: &str) {
    transport.add_json(&url(term, MediaType::Movie), &payload(&[&format!("{term} movie")]));
    transport.add_json(
        &url(term, MediaType::Podcast),
        &payload(&[&format!("{term} podcast")]),
    );
}

pub fn orchestrator(transport: &Arc<SimulatedTransport>) -> SearchOrchestrator {
    SearchOrchestrator::spawn(FetchService::new(transport.clone()), endpoint(), DEBOUNCE)
}

/// Number of requests made for exactly `term`.
pub fn requests_for(transport: &SimulatedTransport, term: &str) -> usize {
    transport.requests_containing(&format!("term={}&", term))
}

/// Number of requests for exactly `term` that ran to completion.
pub fn completions_for(transport: &SimulatedTransport, term: &str) -> usize {
    transport.completed_containing(&format!("term={}&", term))
}

/// Sleeps long enough for any pending debounce and zero-latency fetch to settle.
pub async fn settle() {
    tokio::time::sleep(DEBOUNCE * 3).await;
}
