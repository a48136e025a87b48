//! Property tests for search debouncing.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use crate::fixtures::{DEBOUNCE, echoing_transport, orchestrator, requests_for, settle};

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Submissions spaced closer than the debounce interval collapse into
    /// a single fetch of the last text.
    #[test]
    fn prop_burst_fetches_only_last_query(
        burst in prop::collection::vec(("[a-z]{1,6}", 0u64..290), 1..8)
    ) {
        let runtime = paused_runtime();
        let last = burst.last().map(|(query, _)| query.clone()).unwrap();

        let (requests, others, state) = runtime.block_on(async {
            let transport = Arc::new(echoing_transport());
            let search = orchestrator(&transport);

            for (query, gap) in &burst {
                search.submit(query.clone()).unwrap();
                tokio::time::sleep(Duration::from_millis(*gap)).await;
            }
            settle().await;

            let others: usize = burst
                .iter()
                .filter(|(query, _)| *query != last)
                .map(|(query, _)| requests_for(&transport, query))
                .sum();
            (
                transport.request_count(),
                others,
                search.combined_channel().latest(),
            )
        });

        prop_assert_eq!(requests, 2);
        prop_assert_eq!(others, 0);
        let state = state.unwrap();
        prop_assert_eq!(state.query, last);
        prop_assert_eq!(state.generation, 1);
    }

    /// Published generations only ever increase, whatever the submission timing.
    #[test]
    fn prop_published_generations_are_monotonic(
        steps in prop::collection::vec(("[a-c]{1,2}", 0u64..700), 1..10)
    ) {
        let runtime = paused_runtime();

        let generations = runtime.block_on(async {
            let transport = Arc::new(
                echoing_transport().with_latency(DEBOUNCE / 2),
            );
            let search = orchestrator(&transport);
            let mut observer = search.combined_channel().observe();

            for (query, gap) in &steps {
                search.submit(query.clone()).unwrap();
                tokio::time::sleep(Duration::from_millis(*gap)).await;
            }
            settle().await;

            let mut generations = Vec::new();
            while let Some(state) = observer.try_next() {
                generations.push(state.generation);
            }
            generations
        });

        prop_assert!(!generations.is_empty());
        prop_assert!(generations.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
