//! Per-category section state.

use chrono::{DateTime, Utc};
use tuneshelf_core::{Category, FetchError};

use crate::Generation;
use crate::types::{ResultItem, ResultSet};

/// Latest known state of one home section.
///
/// A failed fetch keeps the last good results and records the error; a
/// successful one replaces the results and clears the error.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionState {
    pub category: Category,
    pub results: ResultSet,
    pub last_error: Option<FetchError>,
    /// Aggregator run that last wrote this state (0 = never loaded)
    pub generation: Generation,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SectionState {
    /// Unloaded state for `category`.
    pub fn new(category: Category) -> Self {
        Self {
            category,
            results: Vec::new(),
            last_error: None,
            generation: 0,
            updated_at: None,
        }
    }

    /// True once any fetch, successful or not, has completed.
    pub fn is_loaded(&self) -> bool {
        self.updated_at.is_some()
    }

    /// Renderable items in server order, capped at the category's display limit.
    pub fn visible_items(&self) -> impl Iterator<Item = &ResultItem> {
        let style = self.category.style;
        self.results
            .iter()
            .filter(move |item| item.is_renderable_in(style))
            .take(self.category.display_limit)
    }

    /// Returns the state after applying a fetch outcome from `generation`,
    /// or `None` when that generation is older than the stored one.
    pub(crate) fn applied(
        &self,
        generation: Generation,
        outcome: Result<ResultSet, FetchError>,
    ) -> Option<SectionState> {
        if generation < self.generation {
            return None;
        }

        let mut next = self.clone();
        next.generation = generation;
        next.updated_at = Some(Utc::now());
        match outcome {
            Ok(results) => {
                next.results = results;
                next.last_error = None;
            }
            Err(error) => next.last_error = Some(error),
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use tuneshelf_core::SectionStyle;

    use super::*;

    fn item(title: &str, collection: Option<&str>) -> ResultItem {
        ResultItem {
            title: Some(title.to_string()),
            subtitle: Some("artist".to_string()),
            image_url: Some("https://img.test/a.jpg".to_string()),
            collection_name: collection.map(str::to_string),
            ..Default::default()
        }
    }

    fn transport_error() -> FetchError {
        FetchError::TransportFailure {
            url: "http://search.test".to_string(),
            reason: "offline".to_string(),
            status: None,
        }
    }

    #[test]
    fn test_failure_keeps_previous_results() {
        let state = SectionState::new(Category::new("summer", "여름"));
        let loaded = state.applied(1, Ok(vec![item("a", Some("c"))])).unwrap();
        let failed = loaded.applied(2, Err(transport_error())).unwrap();

        assert_eq!(failed.results, loaded.results);
        assert_eq!(failed.last_error, Some(transport_error()));
        assert_eq!(failed.generation, 2);

        let recovered = failed.applied(3, Ok(Vec::new())).unwrap();
        assert!(recovered.results.is_empty());
        assert!(recovered.last_error.is_none());
    }

    #[test]
    fn test_older_generation_is_rejected() {
        let state = SectionState::new(Category::new("winter", "겨울"))
            .applied(4, Ok(vec![item("new", Some("c"))]))
            .unwrap();

        assert!(state.applied(3, Ok(Vec::new())).is_none());
        assert!(state.applied(4, Ok(Vec::new())).is_some());
    }

    #[test]
    fn test_visible_items_respects_style_and_limit() {
        let category = Category::new("spring", "봄")
            .with_style(SectionStyle::Featured)
            .with_display_limit(2);
        let mut state = SectionState::new(category);
        state.results = vec![
            item("one", None),
            ResultItem::default(),
            item("two", None),
            item("three", None),
        ];

        let titles: Vec<_> = state
            .visible_items()
            .filter_map(|i| i.title.as_deref())
            .collect();
        assert_eq!(titles, ["one", "two"]);

        state.category.style = SectionStyle::Shelf;
        assert_eq!(state.visible_items().count(), 0);
    }
}
