//! Centralized configuration for Tuneshelf.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

use crate::TuneshelfError;
use crate::catalog::Category;

/// Central configuration for all Tuneshelf components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct TuneshelfConfig {
    pub endpoint: EndpointConfig,
    pub search: SearchConfig,
    pub sections: SectionsConfig,
}

/// Remote search endpoint configuration.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Base URL the query string is appended to
    pub base_url: String,
    /// Storefront country sent as `country`
    pub country: String,
    /// HTTP request timeout, enforced by the transport
    pub request_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "https://itunes.apple.com/search".to_string(),
            country: "KR".to_string(),
            request_timeout: Duration::from_secs(30),
            user_agent: "tuneshelf/0.1.0",
        }
    }
}

impl EndpointConfig {
    /// Checks that the endpoint can produce valid request URLs.
    ///
    /// # Errors
    ///
    /// - `TuneshelfError::Configuration` - Base URL does not parse or country is empty
    pub fn validate(&self) -> Result<(), TuneshelfError> {
        let url = url::Url::parse(&self.base_url).map_err(|e| TuneshelfError::Configuration {
            reason: format!("invalid base URL '{}': {e}", self.base_url),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TuneshelfError::Configuration {
                reason: format!("base URL must be http or https, got '{}'", url.scheme()),
            });
        }

        if self.country.trim().is_empty() {
            return Err(TuneshelfError::Configuration {
                reason: "country must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Incremental search configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Quiet period a query must survive before it is fetched
    pub debounce: Duration,
    /// Items shown per search result section
    pub display_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            display_limit: 4,
        }
    }
}

/// Home-screen section configuration.
#[derive(Debug, Clone)]
pub struct SectionsConfig {
    /// Categories fetched at startup, fixed for the aggregator's lifetime
    pub categories: Vec<Category>,
}

impl Default for SectionsConfig {
    fn default() -> Self {
        Self {
            categories: Category::seasonal_defaults(),
        }
    }
}

impl TuneshelfConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("TUNESHELF_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.endpoint.base_url = base_url;
            }
        }

        if let Ok(country) = std::env::var("TUNESHELF_COUNTRY") {
            if !country.trim().is_empty() {
                config.endpoint.country = country;
            }
        }

        if let Ok(timeout) = std::env::var("TUNESHELF_TIMEOUT_SECS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.endpoint.request_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(debounce) = std::env::var("TUNESHELF_DEBOUNCE_MS") {
            if let Ok(millis) = debounce.parse::<u64>() {
                config.search.debounce = Duration::from_millis(millis);
            }
        }

        config
    }

    /// Validates the endpoint and the section set.
    ///
    /// # Errors
    ///
    /// - `TuneshelfError::Configuration` - Endpoint is invalid, or a section key is repeated
    pub fn validate(&self) -> Result<(), TuneshelfError> {
        self.endpoint.validate()?;

        let mut keys = std::collections::HashSet::new();
        for category in &self.sections.categories {
            if !keys.insert(category.key.as_str()) {
                return Err(TuneshelfError::Configuration {
                    reason: format!("duplicate section key '{}'", category.key),
                });
            }
        }

        Ok(())
    }

    /// Creates a configuration optimized for testing.
    pub fn for_testing() -> Self {
        Self {
            endpoint: EndpointConfig {
                base_url: "http://search.test/search".to_string(),
                request_timeout: Duration::from_secs(5),
                ..Default::default()
            },
            search: SearchConfig {
                debounce: Duration::from_millis(50),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
