//! Home-section aggregation
//!
//! Loads a fixed set of categories concurrently. Each category is its own
//! unit of work: its fetch, its error handling and its `StateChannel` are
//! untouched by what happens to any other category.

mod state;

use std::sync::atomic::{AtomicU64, Ordering};

pub use state::SectionState;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tuneshelf_core::{Category, FetchService, StateChannel};

use crate::Generation;
use crate::endpoint::SearchEndpoint;
use crate::types::SearchPayload;

struct SectionSlot {
    category: Category,
    channel: StateChannel<SectionState>,
}

/// Concurrent loader for the home-screen categories.
///
/// The category set is fixed at construction. Each `start` is a new
/// aggregator generation; a section only accepts results from a generation
/// at least as new as the one it holds, so a slow earlier run never
/// overwrites a later refresh.
pub struct SectionAggregator {
    fetch: FetchService,
    endpoint: SearchEndpoint,
    slots: Vec<SectionSlot>,
    generation: AtomicU64,
    shutdown: CancellationToken,
}

impl SectionAggregator {
    /// Creates the aggregator with one unloaded section per category.
    pub fn new(fetch: FetchService, endpoint: SearchEndpoint, categories: Vec<Category>) -> Self {
        let slots = categories
            .into_iter()
            .map(|category| SectionSlot {
                channel: StateChannel::with_value(SectionState::new(category.clone())),
                category,
            })
            .collect();

        Self {
            fetch,
            endpoint,
            slots,
            generation: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates the aggregator and immediately starts loading every section.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn launch(
        fetch: FetchService,
        endpoint: SearchEndpoint,
        categories: Vec<Category>,
    ) -> (Self, SectionLoad) {
        let aggregator = Self::new(fetch, endpoint, categories);
        let load = aggregator.start();
        (aggregator, load)
    }

    /// Launches one independent fetch per category.
    ///
    /// Calling `start` again refreshes every section under a new generation.
    /// After `shutdown` nothing is launched and the returned load is empty.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> SectionLoad {
        if self.shutdown.is_cancelled() {
            tracing::warn!("Section aggregator is shut down, not loading sections");
            return SectionLoad {
                generation: self.generation.load(Ordering::SeqCst),
                handles: Vec::new(),
            };
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            generation,
            sections = self.slots.len(),
            "Loading home sections"
        );

        let handles = self
            .slots
            .iter()
            .map(|slot| {
                let url = self.endpoint.url_for(&slot.category.term, slot.category.media);
                tokio::spawn(load_section(
                    self.fetch.clone(),
                    url,
                    slot.category.key.clone(),
                    slot.channel.clone(),
                    generation,
                    self.shutdown.child_token(),
                ))
            })
            .collect();

        SectionLoad {
            generation,
            handles,
        }
    }

    /// Channel for the section with `key`, or `None` for an unknown category.
    pub fn section_channel(&self, key: &str) -> Option<StateChannel<SectionState>> {
        self.slots
            .iter()
            .find(|slot| slot.category.key == key)
            .map(|slot| slot.channel.clone())
    }

    /// Categories in display order.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.slots.iter().map(|slot| &slot.category)
    }

    /// Snapshot of every section in display order.
    pub fn snapshot(&self) -> Vec<SectionState> {
        self.slots
            .iter()
            .filter_map(|slot| slot.channel.latest())
            .collect()
    }

    /// Cancels every outstanding section fetch; sections keep their last state.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::debug!("Cancelling outstanding section fetches");
            self.shutdown.cancel();
        }
    }
}

impl Drop for SectionAggregator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for SectionAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionAggregator")
            .field("endpoint", &self.endpoint)
            .field(
                "categories",
                &self.categories().map(|c| c.key.as_str()).collect::<Vec<_>>(),
            )
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

/// Handles to the fetches launched by one `SectionAggregator::start`.
///
/// Dropping it does not stop the fetches.
#[derive(Debug)]
pub struct SectionLoad {
    generation: Generation,
    handles: Vec<JoinHandle<()>>,
}

impl SectionLoad {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Waits until every section of this run has settled or been cancelled.
    pub async fn wait(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Section task panicked");
            }
        }
    }
}

async fn load_section(
    fetch: FetchService,
    url: String,
    key: String,
    channel: StateChannel<SectionState>,
    generation: Generation,
    cancel: CancellationToken,
) {
    let outcome = fetch
        .fetch::<SearchPayload>(&url, &cancel)
        .await
        .map(|payload| payload.results);

    if matches!(&outcome, Err(e) if e.is_cancelled()) {
        tracing::debug!(section = %key, generation, "Section fetch cancelled");
        return;
    }

    let result_count = outcome.as_ref().map(Vec::len).ok();
    let error = outcome.as_ref().err().cloned();

    let published = channel.publish_with(|current| current?.applied(generation, outcome));

    if !published {
        tracing::debug!(
            section = %key,
            generation,
            "Discarding section result from an older generation"
        );
        return;
    }

    match error {
        None => tracing::info!(
            section = %key,
            generation,
            items = result_count.unwrap_or_default(),
            "Section loaded"
        ),
        Some(e) => tracing::warn!(section = %key, generation, error = %e, "Section fetch failed"),
    }
}
