//! Catalog vocabulary shared by home sections and search.

use serde::{Deserialize, Serialize};

/// Media type understood by the search endpoint's `media` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Music,
    Movie,
    Podcast,
}

impl MediaType {
    /// Value sent as the `media` query parameter.
    pub fn api_value(self) -> &'static str {
        match self {
            MediaType::Music => "music",
            MediaType::Movie => "movie",
            MediaType::Podcast => "podcast",
        }
    }

    /// Human readable section header.
    pub fn title(self) -> &'static str {
        match self {
            MediaType::Music => "Music",
            MediaType::Movie => "Movie",
            MediaType::Podcast => "Podcast",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_value())
    }
}

/// How a home section lays out its items.
///
/// `Shelf` cards show the collection name, so items without one are not
/// renderable there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionStyle {
    Featured,
    Shelf,
}

/// A fixed home-screen category fetched by the section aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Stable identifier, used to look up the section's channel
    pub key: String,
    /// Search keyword sent as `term`
    pub term: String,
    /// Section header title
    pub title: String,
    /// Section header subtitle
    pub subtitle: String,
    /// Media type queried for this section
    pub media: MediaType,
    /// Maximum number of items shown
    pub display_limit: usize,
    pub style: SectionStyle,
}

impl Category {
    /// Creates a music shelf category with the term doubling as its title.
    pub fn new(key: impl Into<String>, term: impl Into<String>) -> Self {
        let term = term.into();
        Self {
            key: key.into(),
            title: term.clone(),
            subtitle: String::new(),
            term,
            media: MediaType::Music,
            display_limit: 9,
            style: SectionStyle::Shelf,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        self.title = title.into();
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_media(mut self, media: MediaType) -> Self {
        self.media = media;
        self
    }

    pub fn with_display_limit(mut self, limit: usize) -> Self {
        self.display_limit = limit;
        self
    }

    pub fn with_style(mut self, style: SectionStyle) -> Self {
        self.style = style;
        self
    }

    /// The four seasonal music sections shown on the home screen.
    pub fn seasonal_defaults() -> Vec<Category> {
        vec![
            Category::new("spring", "봄")
                .with_title("봄 Best", "봄에 어울리는 음악 Best 5")
                .with_display_limit(5)
                .with_style(SectionStyle::Featured),
            Category::new("summer", "여름").with_title("여름", "여름에 어울리는 음악"),
            Category::new("autumn", "가을").with_title("가을", "가을에 어울리는 음악"),
            Category::new("winter", "겨울").with_title("겨울", "겨울에 어울리는 음악"),
        ]
    }
}
