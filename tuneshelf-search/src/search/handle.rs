//! Handle for communicating with the search actor.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tuneshelf_core::config::SearchConfig;
use tuneshelf_core::{FetchService, StateChannel, TuneshelfError};

use super::actor::{SearchActor, SearchChannels, run_actor_loop};
use super::commands::SearchCommand;
use super::state::{CombinedSearchState, PhaseUpdate};
use crate::endpoint::SearchEndpoint;
use crate::errors::JoinFailure;

/// Debounced movie + podcast search.
///
/// Cheap to clone; every clone talks to the same actor and hands out the
/// same channels. The actor stops on `shutdown` or once every handle is
/// dropped, cancelling whatever generation is still in flight.
#[derive(Clone)]
pub struct SearchOrchestrator {
    sender: mpsc::UnboundedSender<SearchCommand>,
    channels: SearchChannels,
    debounce: Duration,
}

impl SearchOrchestrator {
    /// Spawns the search actor and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(fetch: FetchService, endpoint: SearchEndpoint, debounce: Duration) -> Self {
        let (sender, commands) = mpsc::unbounded_channel();
        let (outcome_tx, outcomes) = mpsc::unbounded_channel();
        let channels = SearchChannels::new();

        let actor = SearchActor::new(fetch, endpoint, debounce, channels.clone(), outcome_tx);
        tokio::spawn(run_actor_loop(actor, commands, outcomes));

        Self {
            sender,
            channels,
            debounce,
        }
    }

    /// Spawns the search actor with the configured debounce interval.
    pub fn from_config(
        fetch: FetchService,
        endpoint: SearchEndpoint,
        config: &SearchConfig,
    ) -> Self {
        Self::spawn(fetch, endpoint, config.debounce)
    }

    /// Records new query text.
    ///
    /// The text is echoed right away; it is fetched only if no other
    /// submission arrives within the debounce interval and it differs from
    /// the last accepted query.
    ///
    /// # Errors
    /// - `TuneshelfError::OrchestratorShutdown` - Actor is no longer running
    pub fn submit(&self, query: impl Into<String>) -> Result<(), TuneshelfError> {
        self.sender
            .send(SearchCommand::Submit {
                query: query.into(),
            })
            .map_err(|_| TuneshelfError::OrchestratorShutdown)
    }

    /// Joined results of the latest successful generation.
    pub fn combined_channel(&self) -> StateChannel<CombinedSearchState> {
        self.channels.combined.clone()
    }

    /// Latest submitted query text, published before any debounce.
    pub fn query_echo_channel(&self) -> StateChannel<String> {
        self.channels.echo.clone()
    }

    /// Failure of the latest failed generation.
    pub fn failure_channel(&self) -> StateChannel<JoinFailure> {
        self.channels.failures.clone()
    }

    pub fn phase_channel(&self) -> StateChannel<PhaseUpdate> {
        self.channels.phase.clone()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Cancels in-flight work and stops the actor.
    ///
    /// Published state stays readable after shutdown.
    ///
    /// # Errors
    /// - `TuneshelfError::OrchestratorShutdown` - Actor had already stopped
    pub async fn shutdown(&self) -> Result<(), TuneshelfError> {
        let (responder, rx) = oneshot::channel();

        self.sender
            .send(SearchCommand::Shutdown { responder })
            .map_err(|_| TuneshelfError::OrchestratorShutdown)?;

        rx.await.map_err(|_| TuneshelfError::OrchestratorShutdown)
    }
}

impl std::fmt::Debug for SearchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("debounce", &self.debounce)
            .field("running", &!self.sender.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use tuneshelf_core::{
        FetchError, FetchErrorKind, HttpResponse, HttpTransport, MediaType, ScriptedResponse,
        SimulatedTransport,
    };
    use url::Url;

    use super::*;
    use crate::search::state::SearchPhase;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    fn endpoint() -> SearchEndpoint {
        SearchEndpoint::new("http://search.test/search", "KR")
    }

    fn payload(title: &str) -> serde_json::Value {
        json!({
            "results": [{
                "trackName": title,
                "artistName": "someone",
                "artworkUrl100": "https://img.test/a.jpg"
            }]
        })
    }

    fn script(transport: &SimulatedTransport, query: &str) {
        for media in [MediaType::Movie, MediaType::Podcast] {
            transport.add_json(
                &endpoint().url_for(query, media),
                &payload(&format!("{query} {media}")),
            );
        }
    }

    fn orchestrator(transport: &Arc<SimulatedTransport>) -> SearchOrchestrator {
        SearchOrchestrator::spawn(FetchService::new(transport.clone()), endpoint(), DEBOUNCE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_echo_precedes_debounce() {
        let transport = Arc::new(SimulatedTransport::new());
        let search = orchestrator(&transport);
        assert_eq!(search.query_echo_channel().latest().as_deref(), Some(""));

        search.submit("ja").unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(search.query_echo_channel().latest().as_deref(), Some("ja"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_sequence_for_one_query() {
        let transport = Arc::new(SimulatedTransport::new());
        script(&transport, "jazz");
        let search = orchestrator(&transport);
        let mut phases = search.phase_channel().observe();

        search.submit("jazz").unwrap();

        let mut seen = Vec::new();
        while let Some(update) = phases.next_value().await {
            seen.push((update.phase, update.generation));
            if update.phase == SearchPhase::Settled {
                break;
            }
        }
        assert_eq!(
            seen,
            [
                (SearchPhase::Idle, 0),
                (SearchPhase::Debouncing, 0),
                (SearchPhase::Fetching, 1),
                (SearchPhase::Settled, 1),
            ]
        );

        let state = search.combined_channel().latest().unwrap();
        assert_eq!(state.query, "jazz");
        assert_eq!(state.echoed_query, "jazz");
        assert_eq!(state.movie_results.len(), 1);
        assert_eq!(state.podcast_results.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmitting_accepted_query_is_suppressed() {
        let transport = Arc::new(SimulatedTransport::new());
        script(&transport, "jazz");
        let search = orchestrator(&transport);

        search.submit("jazz").unwrap();
        tokio::time::sleep(DEBOUNCE * 2).await;
        search.submit("jazz").unwrap();
        tokio::time::sleep(DEBOUNCE * 2).await;

        assert_eq!(transport.requests_containing("term=jazz"), 2);
        assert_eq!(search.combined_channel().publish_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returning_to_accepted_query_drops_pending() {
        let transport = Arc::new(SimulatedTransport::new());
        script(&transport, "jazz");
        let search = orchestrator(&transport);

        search.submit("jazz").unwrap();
        tokio::time::sleep(DEBOUNCE * 2).await;
        search.submit("jazzy").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        search.submit("jazz").unwrap();
        tokio::time::sleep(DEBOUNCE * 2).await;

        assert_eq!(transport.requests_containing("term=jazzy"), 0);
        assert_eq!(
            search.phase_channel().latest(),
            Some(PhaseUpdate {
                phase: SearchPhase::Settled,
                generation: 1,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_generation_is_cancelled() {
        let transport = Arc::new(SimulatedTransport::new());
        for media in [MediaType::Movie, MediaType::Podcast] {
            transport.add_scripted(
                &endpoint().url_for("jazz", media),
                ScriptedResponse::ok(HttpResponse::json(&payload("slow")))
                    .with_latency(Duration::from_secs(5)),
            );
        }
        script(&transport, "rock");
        let search = orchestrator(&transport);

        search.submit("jazz").unwrap();
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(100)).await;
        search.submit("rock").unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let state = search.combined_channel().latest().unwrap();
        assert_eq!(state.query, "rock");
        assert_eq!(state.generation, 2);
        assert_eq!(search.combined_channel().publish_count(), 1);
        assert!(search.failure_channel().latest().is_none());
    }

    /// Holds its worker thread for the whole request, like a slow decode would.
    struct BlockingTransport {
        block: Duration,
    }

    #[async_trait]
    impl HttpTransport for BlockingTransport {
        async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
            std::thread::sleep(self.block);
            Ok(HttpResponse::json(&payload(url.as_str())))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_movie_and_podcast_fetch_in_parallel() {
        let transport = BlockingTransport {
            block: Duration::from_millis(400),
        };
        let search = SearchOrchestrator::spawn(
            FetchService::new(Arc::new(transport)),
            endpoint(),
            Duration::from_millis(10),
        );
        let mut combined = search.combined_channel().observe();

        let started = std::time::Instant::now();
        search.submit("jazz").unwrap();
        let state = combined.next_value().await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(state.generation, 1);
        assert_eq!(state.movie_results.len(), 1);
        assert_eq!(state.podcast_results.len(), 1);
        assert!(
            elapsed < Duration::from_millis(700),
            "two 400ms fetches took {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reports_media_and_keeps_results() {
        let transport = Arc::new(SimulatedTransport::new());
        script(&transport, "jazz");
        transport.add_json(&endpoint().url_for("rock", MediaType::Movie), &payload("m"));
        transport.add_failure(&endpoint().url_for("rock", MediaType::Podcast), "offline");
        let search = orchestrator(&transport);

        search.submit("jazz").unwrap();
        tokio::time::sleep(DEBOUNCE * 2).await;
        search.submit("rock").unwrap();
        tokio::time::sleep(DEBOUNCE * 2).await;

        let failure = search.failure_channel().latest().unwrap();
        assert_eq!(failure.generation, 2);
        assert_eq!(failure.query, "rock");
        assert_eq!(failure.media, MediaType::Podcast);
        assert_eq!(failure.source.kind(), FetchErrorKind::TransportFailure);

        assert_eq!(search.combined_channel().latest().unwrap().query, "jazz");
        assert_eq!(
            search.phase_channel().latest().map(|update| update.phase),
            Some(SearchPhase::Failed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_rejects_further_submissions() {
        let transport = Arc::new(SimulatedTransport::new());
        let search = orchestrator(&transport);

        search.submit("jazz").unwrap();
        search.shutdown().await.unwrap();

        assert!(matches!(
            search.submit("rock"),
            Err(TuneshelfError::OrchestratorShutdown)
        ));
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(transport.request_count(), 0);
    }
}
