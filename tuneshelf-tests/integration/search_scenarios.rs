//! Integration tests for debounced, generation-tagged search.
//!
//! Every test runs on a paused clock, so debounce windows and simulated
//! latency elapse deterministically.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tuneshelf_core::{
    FetchErrorKind, FetchService, HttpResponse, MediaType, ScriptedResponse, SimulatedTransport,
};
use tuneshelf_search::{SearchOrchestrator, SearchPhase};

use crate::fixtures::{
    DEBOUNCE, completions_for, orchestrator, payload, requests_for, script_success, settle, url,
};

#[tokio::test(start_paused = true)]
async fn test_burst_of_submissions_fetches_only_the_last() {
    let transport = Arc::new(SimulatedTransport::new());
    script_success(&transport, "jazz");
    script_success(&transport, "rock");
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    search.submit("rock").unwrap();
    settle().await;

    assert_eq!(requests_for(&transport, "jazz"), 0);
    assert_eq!(requests_for(&transport, "rock"), 2);

    let state = search.combined_channel().latest().unwrap();
    assert_eq!(state.query, "rock");
    assert_eq!(state.generation, 1);
    assert_eq!(
        state.movie_results[0].title.as_deref(),
        Some("rock movie")
    );
    assert_eq!(
        state.podcast_results[0].title.as_deref(),
        Some("rock podcast")
    );
}

#[tokio::test(start_paused = true)]
async fn test_debounce_waits_for_a_quiet_period() {
    let transport = Arc::new(SimulatedTransport::new());
    script_success(&transport, "jazz");
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    tokio::time::sleep(DEBOUNCE - Duration::from_millis(10)).await;
    assert_eq!(transport.request_count(), 0);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(requests_for(&transport, "jazz"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stale_success_never_overwrites_newer_generation() {
    let transport = Arc::new(SimulatedTransport::new());
    for media in [MediaType::Movie, MediaType::Podcast] {
        transport.add_scripted(
            &url("jazz", media),
            ScriptedResponse::ok(HttpResponse::json(&payload(&["late jazz"])))
                .with_latency(Duration::from_secs(2)),
        );
    }
    script_success(&transport, "rock");
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
    assert_eq!(requests_for(&transport, "jazz"), 2);

    search.submit("rock").unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let combined = search.combined_channel();
    let state = combined.latest().unwrap();
    assert_eq!(state.generation, 2);
    assert_eq!(state.query, "rock");
    assert_eq!(combined.publish_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_failure_is_never_published() {
    let transport = Arc::new(SimulatedTransport::new());
    for media in [MediaType::Movie, MediaType::Podcast] {
        transport.add_scripted(
            &url("jazz", media),
            ScriptedResponse::transport_failure("connection reset")
                .with_latency(Duration::from_secs(2)),
        );
    }
    script_success(&transport, "rock");
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
    search.submit("rock").unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(search.failure_channel().latest().is_none());
    assert_eq!(search.combined_channel().latest().unwrap().generation, 2);
    assert_eq!(
        search.phase_channel().latest().map(|update| update.phase),
        Some(SearchPhase::Settled)
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_query_publishes_empty_state_without_network() {
    let transport = Arc::new(SimulatedTransport::new());
    script_success(&transport, "jazz");
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    settle().await;
    assert_eq!(transport.request_count(), 2);

    search.submit("").unwrap();
    settle().await;

    let state = search.combined_channel().latest().unwrap();
    assert!(state.is_empty);
    assert!(state.movie_results.is_empty());
    assert!(state.podcast_results.is_empty());
    assert_eq!(state.generation, 2);
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_whitespace_query_counts_as_empty() {
    let transport = Arc::new(SimulatedTransport::new());
    let search = orchestrator(&transport);

    search.submit("   ").unwrap();
    settle().await;

    let state = search.combined_channel().latest().unwrap();
    assert!(state.is_empty);
    assert_eq!(state.generation, 1);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_query_cancels_in_flight_search() {
    let transport = Arc::new(SimulatedTransport::new().with_latency(Duration::from_secs(2)));
    script_success(&transport, "jazz");
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
    search.submit("").unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let combined = search.combined_channel();
    assert_eq!(combined.publish_count(), 1);
    assert!(combined.latest().unwrap().is_empty);
    assert_eq!(requests_for(&transport, "jazz"), 2);
    assert_eq!(completions_for(&transport, "jazz"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_fetches_are_dropped_not_awaited() {
    let transport = Arc::new(SimulatedTransport::new());
    for media in [MediaType::Movie, MediaType::Podcast] {
        transport.add_scripted(
            &url("jazz", media),
            ScriptedResponse::ok(HttpResponse::json(&payload(&["slow jazz"])))
                .with_latency(Duration::from_secs(5)),
        );
    }
    script_success(&transport, "rock");
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
    assert_eq!(requests_for(&transport, "jazz"), 2);

    search.submit("rock").unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(completions_for(&transport, "jazz"), 0);
    assert_eq!(completions_for(&transport, "rock"), 2);
    assert_eq!(search.combined_channel().latest().unwrap().query, "rock");
}

#[tokio::test(start_paused = true)]
async fn test_failed_generation_then_recovery() {
    let transport = Arc::new(SimulatedTransport::new());
    for query in ["a", "ab", "abc", "abcd", "abcdef"] {
        script_success(&transport, query);
    }
    transport.add_json(&url("abcde", MediaType::Movie), &payload(&["movie"]));
    transport.add_failure(&url("abcde", MediaType::Podcast), "connection reset");
    let search = orchestrator(&transport);

    for query in ["a", "ab", "abc", "abcd"] {
        search.submit(query).unwrap();
        settle().await;
    }
    assert_eq!(search.combined_channel().latest().unwrap().generation, 4);

    search.submit("abcde").unwrap();
    settle().await;

    let failure = search.failure_channel().latest().unwrap();
    assert_eq!(failure.generation, 5);
    assert_eq!(failure.query, "abcde");
    assert_eq!(failure.media, MediaType::Podcast);
    assert_eq!(failure.source.kind(), FetchErrorKind::TransportFailure);
    assert_eq!(search.combined_channel().latest().unwrap().generation, 4);

    search.submit("abcdef").unwrap();
    settle().await;

    let state = search.combined_channel().latest().unwrap();
    assert_eq!(state.generation, 6);
    assert_eq!(state.query, "abcdef");
    assert_eq!(search.failure_channel().latest().unwrap().generation, 5);
    assert_eq!(
        search.phase_channel().latest().map(|update| update.phase),
        Some(SearchPhase::Settled)
    );
}

#[tokio::test(start_paused = true)]
async fn test_movie_failure_publishes_no_partial_state() {
    let transport = Arc::new(SimulatedTransport::new());
    transport.add_failure(&url("jazz", MediaType::Movie), "connection reset");
    transport.add_json(&url("jazz", MediaType::Podcast), &payload(&["podcast"]));
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    settle().await;

    let failure = search.failure_channel().latest().unwrap();
    assert_eq!(failure.generation, 1);
    assert_eq!(failure.media, MediaType::Movie);
    assert_eq!(failure.source.kind(), FetchErrorKind::TransportFailure);
    assert!(search.combined_channel().latest().is_none());
    assert_eq!(
        search.phase_channel().latest().map(|update| update.phase),
        Some(SearchPhase::Failed)
    );
}

#[tokio::test(start_paused = true)]
async fn test_both_sides_failing_reports_the_first_failure_once() {
    let transport = Arc::new(SimulatedTransport::new());
    transport.add_scripted(
        &url("jazz", MediaType::Movie),
        ScriptedResponse::transport_failure("movie backend down")
            .with_latency(Duration::from_secs(1)),
    );
    transport.add_json(
        &url("jazz", MediaType::Podcast),
        &serde_json::json!({ "resultCount": 0 }),
    );
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    tokio::time::sleep(DEBOUNCE + Duration::from_secs(3)).await;

    let failures = search.failure_channel();
    assert_eq!(failures.publish_count(), 1);
    let failure = failures.latest().unwrap();
    assert_eq!(failure.media, MediaType::Podcast);
    assert_eq!(failure.source.kind(), FetchErrorKind::DecodeFailure);
    assert!(search.combined_channel().latest().is_none());
    assert_eq!(completions_for(&transport, "jazz"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_is_a_decode_failure() {
    let transport = Arc::new(SimulatedTransport::new());
    transport.add_json(&url("jazz", MediaType::Movie), &payload(&["ok"]));
    transport.add_json(
        &url("jazz", MediaType::Podcast),
        &serde_json::json!({ "resultCount": 0 }),
    );
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    settle().await;

    let failure = search.failure_channel().latest().unwrap();
    assert_eq!(failure.media, MediaType::Podcast);
    assert_eq!(failure.source.kind(), FetchErrorKind::DecodeFailure);
    assert!(search.combined_channel().latest().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_endpoint_fails_without_network() {
    let transport = Arc::new(SimulatedTransport::new());
    let search = SearchOrchestrator::spawn(
        FetchService::new(transport.clone()),
        tuneshelf_search::SearchEndpoint::new("not a url", "KR"),
        DEBOUNCE,
    );

    search.submit("jazz").unwrap();
    settle().await;

    let failure = search.failure_channel().latest().unwrap();
    assert_eq!(failure.source.kind(), FetchErrorKind::InvalidUrl);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_same_text_twice_fetches_once() {
    let transport = Arc::new(SimulatedTransport::new());
    script_success(&transport, "jazz");
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    search.submit("jazz").unwrap();
    settle().await;
    search.submit("jazz").unwrap();
    settle().await;

    assert_eq!(requests_for(&transport, "jazz"), 2);
    assert_eq!(search.combined_channel().publish_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_query_echo_follows_every_submission() {
    let transport = Arc::new(SimulatedTransport::new());
    let search = orchestrator(&transport);
    let echoes = search.query_echo_channel().observe();

    for text in ["j", "ja", "jaz"] {
        search.submit(text).unwrap();
    }

    let seen: Vec<String> = echoes.take(4).collect().await;
    assert_eq!(seen, ["", "j", "ja", "jaz"]);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_combined_state_records_latest_echo() {
    let transport = Arc::new(SimulatedTransport::new().with_latency(Duration::from_millis(500)));
    script_success(&transport, "jazz");
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(300)).await;
    search.submit("jazz!").unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    let state = search.combined_channel().latest().unwrap();
    assert_eq!(state.query, "jazz");
    assert_eq!(state.echoed_query, "jazz!");
    assert_eq!(state.generation, 1);
    assert_eq!(requests_for(&transport, "jazz%21"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_observer_sees_latest_state() {
    let transport = Arc::new(SimulatedTransport::new());
    script_success(&transport, "jazz");
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    settle().await;

    let mut observer = search.combined_channel().observe();
    let replayed = observer.try_next().unwrap();
    assert_eq!(replayed.query, "jazz");
    assert!(observer.try_next().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_in_flight_generation() {
    let transport = Arc::new(SimulatedTransport::new().with_latency(Duration::from_secs(2)));
    script_success(&transport, "jazz");
    let search = orchestrator(&transport);

    search.submit("jazz").unwrap();
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
    search.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(search.combined_channel().latest().is_none());
    assert!(search.failure_channel().latest().is_none());
    assert_eq!(completions_for(&transport, "jazz"), 0);
    assert!(search.submit("rock").is_err());
}
