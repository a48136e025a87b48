//! Published search state.

use tuneshelf_core::MediaType;

use crate::Generation;
use crate::types::{ResultItem, ResultSet};

/// Joined result of one successful search generation.
///
/// Replaced wholesale on every successful join, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedSearchState {
    pub movie_results: ResultSet,
    pub podcast_results: ResultSet,
    /// True iff both result sets are empty
    pub is_empty: bool,
    /// Query that produced these results
    pub query: String,
    /// Most recently submitted query at publish time
    pub echoed_query: String,
    pub generation: Generation,
}

impl CombinedSearchState {
    pub fn new(
        generation: Generation,
        query: impl Into<String>,
        echoed_query: impl Into<String>,
        movie_results: ResultSet,
        podcast_results: ResultSet,
    ) -> Self {
        let is_empty = movie_results.is_empty() && podcast_results.is_empty();
        Self {
            movie_results,
            podcast_results,
            is_empty,
            query: query.into(),
            echoed_query: echoed_query.into(),
            generation,
        }
    }

    /// State published for an empty query, without network access.
    pub fn empty(generation: Generation, query: impl Into<String>) -> Self {
        let query = query.into();
        Self::new(generation, query.clone(), query, Vec::new(), Vec::new())
    }

    pub fn results_for(&self, media: MediaType) -> &[ResultItem] {
        match media {
            MediaType::Movie => &self.movie_results,
            MediaType::Podcast => &self.podcast_results,
            MediaType::Music => &[],
        }
    }

    /// Renderable items for `media` in server order, at most `limit`.
    pub fn visible(&self, media: MediaType, limit: usize) -> impl Iterator<Item = &ResultItem> {
        self.results_for(media)
            .iter()
            .filter(|item| item.is_renderable())
            .take(limit)
    }
}

/// Lifecycle of the current query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Debouncing,
    Fetching,
    Settled,
    Failed,
}

/// Phase change tagged with the generation it refers to.
///
/// During `Debouncing` the generation is the last accepted one, since the
/// pending query has not been assigned its own yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseUpdate {
    pub phase: SearchPhase,
    pub generation: Generation,
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn items(count: usize) -> ResultSet {
        (0..count)
            .map(|i| ResultItem {
                title: Some(format!("item {i}")),
                ..Default::default()
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_is_empty_iff_both_sets_empty(movies in 0usize..4, podcasts in 0usize..4) {
            let state = CombinedSearchState::new(1, "q", "q", items(movies), items(podcasts));
            prop_assert_eq!(state.is_empty, movies == 0 && podcasts == 0);
        }
    }

    #[test]
    fn test_empty_state() {
        let state = CombinedSearchState::empty(3, "");
        assert!(state.is_empty);
        assert!(state.movie_results.is_empty());
        assert!(state.podcast_results.is_empty());
        assert_eq!(state.generation, 3);
    }

    #[test]
    fn test_visible_filters_and_limits() {
        let renderable = |title: &str| ResultItem {
            title: Some(title.to_string()),
            subtitle: Some("host".to_string()),
            image_url: Some("https://img.test/p.jpg".to_string()),
            ..Default::default()
        };
        let podcasts = vec![
            renderable("a"),
            ResultItem::default(),
            renderable("b"),
            renderable("c"),
        ];
        let state = CombinedSearchState::new(1, "q", "q", Vec::new(), podcasts);

        let titles: Vec<_> = state
            .visible(MediaType::Podcast, 2)
            .filter_map(|item| item.title.as_deref())
            .collect();
        assert_eq!(titles, ["a", "b"]);
        assert_eq!(state.visible(MediaType::Movie, 4).count(), 0);
        assert!(!state.is_empty);
    }
}
