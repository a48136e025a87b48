//! Data types for search endpoint payloads.

use serde::{Deserialize, Serialize};
use tuneshelf_core::SectionStyle;

/// One entry of the endpoint's `results` array.
///
/// Every field is optional because the upstream payload is schema-loose. An
/// item missing display fields is kept in its result set but reported as not
/// renderable; it is never a fetch error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    #[serde(rename = "trackName")]
    pub title: Option<String>,
    #[serde(rename = "artistName")]
    pub subtitle: Option<String>,
    #[serde(rename = "artworkUrl100")]
    pub image_url: Option<String>,
    #[serde(rename = "collectionName")]
    pub collection_name: Option<String>,
    pub kind: Option<String>,
    #[serde(rename = "artworkUrl600")]
    pub high_res_image_url: Option<String>,
}

impl ResultItem {
    /// True when title, subtitle and a parsable artwork URL are present.
    pub fn is_renderable(&self) -> bool {
        self.title.is_some()
            && self.subtitle.is_some()
            && self
                .image_url
                .as_deref()
                .is_some_and(|url| url::Url::parse(url).is_ok())
    }

    /// Renderability for a home section of the given style.
    pub fn is_renderable_in(&self, style: SectionStyle) -> bool {
        match style {
            SectionStyle::Featured => self.is_renderable(),
            SectionStyle::Shelf => self.is_renderable() && self.collection_name.is_some(),
        }
    }

    /// Best available artwork, preferring the high resolution variant.
    pub fn best_image_url(&self) -> Option<&str> {
        self.high_res_image_url
            .as_deref()
            .or(self.image_url.as_deref())
    }
}

/// Ordered results in server response order.
pub type ResultSet = Vec<ResultItem>;

/// Decoded body of a search endpoint response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPayload {
    pub results: ResultSet,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_payload_decodes_with_missing_fields() {
        let payload: SearchPayload = serde_json::from_value(json!({
            "resultCount": 2,
            "results": [
                {
                    "trackName": "Spring Day",
                    "artistName": "BTS",
                    "artworkUrl100": "https://img.test/100.jpg",
                    "artworkUrl600": "https://img.test/600.jpg",
                    "collectionName": "You Never Walk Alone",
                    "kind": "song"
                },
                { "artistName": "Unknown" }
            ]
        }))
        .unwrap();

        assert_eq!(payload.results.len(), 2);
        assert_eq!(payload.results[0].title.as_deref(), Some("Spring Day"));
        assert_eq!(payload.results[0].kind.as_deref(), Some("song"));
        assert_eq!(
            payload.results[0].best_image_url(),
            Some("https://img.test/600.jpg")
        );
        assert_eq!(payload.results[1], ResultItem {
            subtitle: Some("Unknown".to_string()),
            ..Default::default()
        });
    }

    #[test]
    fn test_missing_results_is_shape_mismatch() {
        let decoded = serde_json::from_value::<SearchPayload>(json!({ "errorMessage": "nope" }));
        assert!(decoded.is_err());
    }

    #[test]
    fn test_renderability() {
        let mut item = ResultItem {
            title: Some("Title".to_string()),
            subtitle: Some("Artist".to_string()),
            image_url: Some("https://img.test/a.jpg".to_string()),
            ..Default::default()
        };
        assert!(item.is_renderable());
        assert!(item.is_renderable_in(SectionStyle::Featured));
        assert!(!item.is_renderable_in(SectionStyle::Shelf));

        item.collection_name = Some("Album".to_string());
        assert!(item.is_renderable_in(SectionStyle::Shelf));

        item.image_url = Some("not a url".to_string());
        assert!(!item.is_renderable());

        item.image_url = Some("https://img.test/a.jpg".to_string());
        item.title = None;
        assert!(!item.is_renderable());
    }
}
