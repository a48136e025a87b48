//! Actor implementation for the search orchestrator.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tuneshelf_core::{FetchError, FetchService, MediaType, StateChannel};

use super::commands::{JoinOutcome, SearchCommand};
use super::state::{CombinedSearchState, PhaseUpdate, SearchPhase};
use crate::Generation;
use crate::endpoint::SearchEndpoint;
use crate::errors::JoinFailure;
use crate::types::{ResultSet, SearchPayload};

/// Channels the actor publishes to and handles hand out.
#[derive(Clone)]
pub(crate) struct SearchChannels {
    pub combined: StateChannel<CombinedSearchState>,
    pub echo: StateChannel<String>,
    pub failures: StateChannel<JoinFailure>,
    pub phase: StateChannel<PhaseUpdate>,
}

impl SearchChannels {
    pub fn new() -> Self {
        Self {
            combined: StateChannel::new(),
            echo: StateChannel::with_value(String::new()),
            failures: StateChannel::new(),
            phase: StateChannel::with_value(PhaseUpdate {
                phase: SearchPhase::Idle,
                generation: 0,
            }),
        }
    }
}

struct PendingQuery {
    query: String,
    deadline: Instant,
}

struct InFlight {
    generation: Generation,
    cancel: CancellationToken,
}

/// Sole owner of the debounce deadline, generation counter and in-flight token.
pub(crate) struct SearchActor {
    fetch: FetchService,
    endpoint: SearchEndpoint,
    debounce: Duration,
    channels: SearchChannels,
    pending: Option<PendingQuery>,
    last_accepted: Option<String>,
    latest_submitted: String,
    generation: Generation,
    in_flight: Option<InFlight>,
    last_outcome: SearchPhase,
    outcomes: mpsc::UnboundedSender<JoinOutcome>,
    root: CancellationToken,
}

impl SearchActor {
    pub fn new(
        fetch: FetchService,
        endpoint: SearchEndpoint,
        debounce: Duration,
        channels: SearchChannels,
        outcomes: mpsc::UnboundedSender<JoinOutcome>,
    ) -> Self {
        Self {
            fetch,
            endpoint,
            debounce,
            channels,
            pending: None,
            last_accepted: None,
            latest_submitted: String::new(),
            generation: 0,
            in_flight: None,
            last_outcome: SearchPhase::Idle,
            outcomes,
            root: CancellationToken::new(),
        }
    }

    fn submit(&mut self, query: String) {
        self.channels.echo.publish(query.clone());
        self.latest_submitted = query.clone();

        if self.last_accepted.as_deref() == Some(query.as_str()) {
            if self.pending.take().is_some() {
                tracing::debug!(
                    query = %query,
                    "Query back to the accepted one, dropping pending debounce"
                );
                self.publish_phase(self.resting_phase());
            } else {
                tracing::trace!(query = %query, "Duplicate query suppressed");
            }
            return;
        }

        let deadline = Instant::now() + self.debounce;
        let restarted = self
            .pending
            .replace(PendingQuery { query, deadline })
            .is_some();

        if restarted {
            tracing::trace!("Debounce window restarted");
        } else {
            self.publish_phase(SearchPhase::Debouncing);
        }
    }

    fn accept_pending(&mut self) {
        let Some(PendingQuery { query, .. }) = self.pending.take() else {
            return;
        };

        self.generation += 1;
        let generation = self.generation;

        if let Some(previous) = self.in_flight.take() {
            tracing::debug!(
                superseded = previous.generation,
                generation,
                "Cancelling superseded search"
            );
            previous.cancel.cancel();
        }

        self.last_accepted = Some(query.clone());

        if query.trim().is_empty() {
            tracing::info!(generation, "Empty query accepted, publishing empty results");
            self.channels
                .combined
                .publish(CombinedSearchState::empty(generation, query));
            self.last_outcome = SearchPhase::Settled;
            self.publish_phase(SearchPhase::Settled);
            return;
        }

        tracing::info!(generation, query = %query, "Search accepted");

        let cancel = self.root.child_token();
        self.in_flight = Some(InFlight {
            generation,
            cancel: cancel.clone(),
        });
        self.publish_phase(SearchPhase::Fetching);

        tokio::spawn(run_generation(
            self.fetch.clone(),
            self.endpoint.clone(),
            generation,
            query,
            cancel,
            self.outcomes.clone(),
        ));
    }

    fn complete(&mut self, outcome: JoinOutcome) {
        if outcome.generation != self.generation {
            tracing::debug!(
                stale = outcome.generation,
                current = self.generation,
                "Discarding result of a superseded generation"
            );
            return;
        }
        self.in_flight = None;

        match outcome.result {
            Ok((movies, podcasts)) => {
                tracing::info!(
                    generation = outcome.generation,
                    query = %outcome.query,
                    movies = movies.len(),
                    podcasts = podcasts.len(),
                    "Search settled"
                );
                self.channels.combined.publish(CombinedSearchState::new(
                    outcome.generation,
                    outcome.query,
                    self.latest_submitted.clone(),
                    movies,
                    podcasts,
                ));
                self.last_outcome = SearchPhase::Settled;
            }
            Err((media, source)) => {
                tracing::warn!(
                    generation = outcome.generation,
                    query = %outcome.query,
                    %media,
                    error = %source,
                    "Search generation failed"
                );
                self.channels.failures.publish(JoinFailure {
                    generation: outcome.generation,
                    query: outcome.query,
                    media,
                    source,
                });
                self.last_outcome = SearchPhase::Failed;
            }
        }

        if self.pending.is_none() {
            self.publish_phase(self.last_outcome);
        }
    }

    fn stop(&mut self) {
        self.pending = None;
        self.in_flight = None;
        self.root.cancel();
    }

    fn resting_phase(&self) -> SearchPhase {
        if self.in_flight.is_some() {
            SearchPhase::Fetching
        } else {
            self.last_outcome
        }
    }

    fn publish_phase(&self, phase: SearchPhase) {
        tracing::trace!(?phase, generation = self.generation, "Search phase");
        self.channels.phase.publish(PhaseUpdate {
            phase,
            generation: self.generation,
        });
    }
}

/// Runs the actor until shutdown or until every handle is dropped.
///
/// Commands are handled one at a time, so the generation counter and the
/// debounce deadline are only ever advanced from this loop.
pub(crate) async fn run_actor_loop(
    mut actor: SearchActor,
    mut commands: mpsc::UnboundedReceiver<SearchCommand>,
    mut outcomes: mpsc::UnboundedReceiver<JoinOutcome>,
) {
    tracing::debug!("Search actor started");

    loop {
        let deadline = actor.pending.as_ref().map(|pending| pending.deadline);

        tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(SearchCommand::Submit { query }) => actor.submit(query),
                Some(SearchCommand::Shutdown { responder }) => {
                    commands.close();
                    actor.stop();
                    let _ = responder.send(());
                    break;
                }
                None => {
                    actor.stop();
                    break;
                }
            },
            Some(outcome) = outcomes.recv() => actor.complete(outcome),
            () = debounce_elapsed(deadline) => actor.accept_pending(),
        }
    }

    tracing::debug!("Search actor stopped");
}

async fn debounce_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Fetches both media types for one generation and reports the joined outcome.
///
/// Each media type is fetched on its own task so decoding runs in parallel.
/// The first failure ends the join and cancels the other sub-fetch. A
/// cancelled generation reports nothing.
async fn run_generation(
    fetch: FetchService,
    endpoint: SearchEndpoint,
    generation: Generation,
    query: String,
    cancel: CancellationToken,
    outcomes: mpsc::UnboundedSender<JoinOutcome>,
) {
    // Stops whichever sub-fetch is still running once the join resolves
    let siblings = cancel.child_token();
    let _siblings_guard = siblings.clone().drop_guard();

    let movies = spawn_media(&fetch, &endpoint, &query, MediaType::Movie, &siblings);
    let podcasts = spawn_media(&fetch, &endpoint, &query, MediaType::Podcast, &siblings);
    let result = futures::future::try_join(movies, podcasts).await;

    if cancel.is_cancelled() {
        tracing::trace!(generation, "Generation cancelled, dropping its outcome");
        return;
    }

    let _ = outcomes.send(JoinOutcome {
        generation,
        query,
        result,
    });
}

fn spawn_media(
    fetch: &FetchService,
    endpoint: &SearchEndpoint,
    query: &str,
    media: MediaType,
    cancel: &CancellationToken,
) -> impl Future<Output = Result<ResultSet, (MediaType, FetchError)>> + use<> {
    let url = endpoint.url_for(query, media);
    let task = tokio::spawn({
        let fetch = fetch.clone();
        let cancel = cancel.clone();
        let url = url.clone();
        async move {
            fetch
                .fetch::<SearchPayload>(&url, &cancel)
                .await
                .map(|payload| payload.results)
        }
    });

    async move {
        match task.await {
            Ok(result) => result.map_err(|error| (media, error)),
            Err(e) => Err((
                media,
                FetchError::TransportFailure {
                    url,
                    reason: format!("fetch task failed: {e}"),
                    status: None,
                },
            )),
        }
    }
}
