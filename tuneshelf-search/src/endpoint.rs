//! Search endpoint URL construction.

use tuneshelf_core::MediaType;
use tuneshelf_core::config::EndpointConfig;

/// Builds `GET <base>?term=<query>&country=<locale>&media=<media-type>` URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEndpoint {
    base_url: String,
    country: String,
}

impl SearchEndpoint {
    pub fn new(base_url: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            country: country.into(),
        }
    }

    pub fn from_config(config: &EndpointConfig) -> Self {
        Self::new(config.base_url.clone(), config.country.clone())
    }

    /// URL for `term` restricted to `media`, with the term percent-encoded.
    ///
    /// The result is not validated here; a malformed base surfaces as
    /// `FetchError::InvalidUrl` when fetched.
    pub fn url_for(&self, term: &str, media: MediaType) -> String {
        format!(
            "{}?term={}&country={}&media={}",
            self.base_url,
            urlencoding::encode(term),
            urlencoding::encode(&self.country),
            media.api_value()
        )
    }

    pub fn country(&self) -> &str {
        &self.country
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_term() {
        let endpoint = SearchEndpoint::new("https://itunes.apple.com/search", "KR");

        assert_eq!(
            endpoint.url_for("jazz", MediaType::Movie),
            "https://itunes.apple.com/search?term=jazz&country=KR&media=movie"
        );
        assert_eq!(
            endpoint.url_for("rock & roll", MediaType::Podcast),
            "https://itunes.apple.com/search?term=rock%20%26%20roll&country=KR&media=podcast"
        );
        assert_eq!(
            endpoint.url_for("봄", MediaType::Music),
            "https://itunes.apple.com/search?term=%EB%B4%84&country=KR&media=music"
        );
    }

    #[test]
    fn test_from_config() {
        let endpoint = SearchEndpoint::from_config(&EndpointConfig::default());
        assert_eq!(endpoint.country(), "KR");
        assert!(
            endpoint
                .url_for("a", MediaType::Music)
                .starts_with("https://itunes.apple.com/search?")
        );
    }
}
