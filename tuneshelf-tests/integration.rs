//! Integration tests for Tuneshelf
//!
//! These tests drive the section aggregator and the search orchestrator
//! through the simulated transport and check what observers see: which
//! requests were made, which generation got published, and how failures
//! stay contained.

#[path = "integration/fixtures.rs"]
mod fixtures;

#[path = "integration/search_scenarios.rs"]
mod search_scenarios;

#[path = "integration/search_properties.rs"]
mod search_properties;

#[path = "integration/section_isolation.rs"]
mod section_isolation;
