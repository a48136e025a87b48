//! Integration tests for home-section loading.
//!
//! Verifies that each seasonal category loads on its own: a failing or
//! malformed category never disturbs the others.

use std::sync::Arc;
use std::time::Duration;

use tuneshelf_core::{
    Category, FetchErrorKind, FetchService, HttpResponse, MediaType, ScriptedResponse,
    SectionStyle, SimulatedTransport, TuneshelfConfig,
};
use tuneshelf_search::{SearchEndpoint, SectionAggregator};

use crate::fixtures::{endpoint, payload, url};

fn script_seasons(transport: &SimulatedTransport) {
    for category in Category::seasonal_defaults() {
        let titles: Vec<String> = (1..=12).map(|i| format!("{} {i}", category.key)).collect();
        let titles: Vec<&str> = titles.iter().map(String::as_str).collect();
        transport.add_json(&url(&category.term, MediaType::Music), &payload(&titles));
    }
}

#[tokio::test]
async fn test_failing_category_is_isolated() {
    let transport = Arc::new(SimulatedTransport::new());
    script_seasons(&transport);
    transport.add_failure(&url("여름", MediaType::Music), "connection reset");

    let (aggregator, load) = SectionAggregator::launch(
        FetchService::new(transport.clone()),
        endpoint(),
        Category::seasonal_defaults(),
    );
    load.wait().await;

    let summer = aggregator.section_channel("summer").unwrap().latest().unwrap();
    assert!(summer.results.is_empty());
    assert_eq!(
        summer.last_error.as_ref().map(|error| error.kind()),
        Some(FetchErrorKind::TransportFailure)
    );

    for key in ["spring", "autumn", "winter"] {
        let channel = aggregator.section_channel(key).unwrap();
        let section = channel.latest().unwrap();
        assert_eq!(section.results.len(), 12, "section {key}");
        assert!(section.last_error.is_none(), "section {key}");
        assert_eq!(channel.publish_count(), 1, "section {key}");
    }
    assert_eq!(transport.request_count(), 4);
}

#[tokio::test]
async fn test_decode_failure_is_isolated() {
    let transport = Arc::new(SimulatedTransport::new());
    script_seasons(&transport);
    transport.add_response(
        &url("겨울", MediaType::Music),
        HttpResponse::new(200, b"<html>maintenance</html>".to_vec()),
    );

    let (aggregator, load) = SectionAggregator::launch(
        FetchService::new(transport.clone()),
        endpoint(),
        Category::seasonal_defaults(),
    );
    load.wait().await;

    let sections = aggregator.snapshot();
    let keys: Vec<_> = sections.iter().map(|s| s.category.key.as_str()).collect();
    assert_eq!(keys, ["spring", "summer", "autumn", "winter"]);

    for section in &sections {
        let decode_failed = section
            .last_error
            .as_ref()
            .is_some_and(|error| error.kind() == FetchErrorKind::DecodeFailure);
        assert_eq!(decode_failed, section.category.key == "winter");
    }
}

#[tokio::test]
async fn test_visible_items_follow_category_limits() {
    let transport = Arc::new(SimulatedTransport::new());
    script_seasons(&transport);

    let (aggregator, load) = SectionAggregator::launch(
        FetchService::new(transport.clone()),
        endpoint(),
        Category::seasonal_defaults(),
    );
    load.wait().await;

    let spring = aggregator.section_channel("spring").unwrap().latest().unwrap();
    assert_eq!(spring.category.style, SectionStyle::Featured);
    assert_eq!(spring.visible_items().count(), 5);

    let autumn = aggregator.section_channel("autumn").unwrap().latest().unwrap();
    assert_eq!(autumn.category.style, SectionStyle::Shelf);
    assert_eq!(autumn.visible_items().count(), 9);
    assert_eq!(autumn.results.len(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_keeps_previous_results() {
    let transport = Arc::new(SimulatedTransport::new());
    script_seasons(&transport);

    let aggregator = SectionAggregator::new(
        FetchService::new(transport.clone()),
        endpoint(),
        Category::seasonal_defaults(),
    );
    aggregator.start().wait().await;

    transport.add_failure(&url("가을", MediaType::Music), "timed out");
    aggregator.start().wait().await;

    let autumn = aggregator.section_channel("autumn").unwrap().latest().unwrap();
    assert_eq!(autumn.results.len(), 12);
    assert_eq!(autumn.generation, 2);
    assert_eq!(
        autumn.last_error.as_ref().map(|error| error.kind()),
        Some(FetchErrorKind::TransportFailure)
    );

    let spring = aggregator.section_channel("spring").unwrap().latest().unwrap();
    assert!(spring.last_error.is_none());
    assert_eq!(spring.generation, 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_category_does_not_delay_others() {
    let transport = Arc::new(SimulatedTransport::new());
    script_seasons(&transport);
    transport.add_scripted(
        &url("봄", MediaType::Music),
        ScriptedResponse::ok(HttpResponse::json(&payload(&["late"])))
            .with_latency(Duration::from_secs(10)),
    );

    let (aggregator, load) = SectionAggregator::launch(
        FetchService::new(transport.clone()),
        endpoint(),
        Category::seasonal_defaults(),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(!aggregator.section_channel("spring").unwrap().latest().unwrap().is_loaded());
    for key in ["summer", "autumn", "winter"] {
        assert!(aggregator.section_channel(key).unwrap().latest().unwrap().is_loaded());
    }

    load.wait().await;
    assert!(aggregator.section_channel("spring").unwrap().latest().unwrap().is_loaded());
}

#[tokio::test]
async fn test_sections_from_test_configuration() {
    let config = TuneshelfConfig::for_testing();
    let transport = Arc::new(SimulatedTransport::new());
    script_seasons(&transport);

    let (aggregator, load) = SectionAggregator::launch(
        FetchService::new(transport.clone()),
        SearchEndpoint::from_config(&config.endpoint),
        config.sections.categories.clone(),
    );
    load.wait().await;

    assert!(aggregator.snapshot().iter().all(|section| section.is_loaded()));
    assert!(
        transport
            .requests()
            .iter()
            .all(|request| request.contains("media=music") && request.contains("country=KR"))
    );
}
