//! Application configuration
//!
//! Layered the usual way: compiled defaults, then an optional
//! `lodestar.toml`, then `LODESTAR_*` environment variables. Nested keys use
//! a double underscore, e.g. `LODESTAR_FETCH__MAX_CONCURRENCY=5`.
//!
//! - `logging`: subscriber filter and output format
//! - `cache`: page and query cache sizes and TTLs
//! - `fetch`: batch concurrency, deadline and page client settings
//! - `search`: link count and Brave Search API settings
//! - `inference`: Ollama backend
//! - `retry`: backoff for opening generation streams

mod cache;
mod fetch;
mod logging;
mod search;

use std::path::Path;

use ai_core::InferenceConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use cache::CacheConfig;
pub use fetch::FetchConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use search::SearchConfig;

use crate::retry::RetryConfig;

/// Base name of the optional configuration file in the working directory
pub const CONFIG_FILE_NAME: &str = "lodestar";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "LODESTAR";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl AppConfig {
    /// Load from `lodestar.toml` (if present) and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::build(config::File::with_name(CONFIG_FILE_NAME).required(false))
    }

    /// Load from an explicit file, which must exist, and the environment
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        Self::build(config::File::from(path).required(true))
    }

    fn build<S>(file: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: Self = config.try_deserialize()?;
        app.validate().map_err(config::ConfigError::Message)?;
        debug!(
            max_concurrency = app.fetch.max_concurrency,
            search_enabled = app.search.is_enabled(),
            model = %app.inference.default_model,
            "Configuration loaded"
        );
        Ok(app)
    }

    /// Check cross-field constraints every section imposes
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()?;
        self.fetch.validate()?;
        self.search.validate()?;
        self.inference.validate()?;
        self.retry.validate()
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fetch.max_concurrency, 3);
        assert_eq!(config.fetch.batch_timeout_secs, 30);
        assert_eq!(config.search.max_links, 10);
        assert_eq!(config.cache.page_ttl(), Duration::from_secs(3600));
        assert_eq!(config.cache.query_ttl(), Duration::from_secs(1800));
        assert_eq!(config.retry.max_attempts(), 3);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(!config.search.is_enabled());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = write_config(
            r#"
[logging]
format = "json"

[fetch]
max_concurrency = 5

[fetch.page]
referrer = "https://example.org/"

[search]
max_links = 4

[search.brave]
brave_api_key = "test-key"

[retry]
max_retries = 1
"#,
        );

        let config = AppConfig::load_from(file.path()).unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.fetch.max_concurrency, 5);
        assert_eq!(config.fetch.batch_timeout_secs, 30);
        assert_eq!(
            config.fetch.page.referrer.as_deref(),
            Some("https://example.org/")
        );
        assert_eq!(config.search.max_links, 4);
        assert!(config.search.is_enabled());
        assert_eq!(config.retry.max_attempts(), 2);
        assert_eq!(config.retry.initial_delay_ms, 1_000);
    }

    #[test]
    fn invalid_values_fail_loading() {
        let file = write_config("[fetch]\nmax_concurrency = 0\n");
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("max_concurrency"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(AppConfig::load_from(Path::new("/nonexistent/lodestar.toml")).is_err());
    }

    #[test]
    fn settings_carry_durations() {
        let config = AppConfig::default();
        let fetch = config.fetch.settings(config.cache.page_ttl());
        assert_eq!(fetch.max_concurrency, 3);
        assert_eq!(fetch.batch_timeout, Duration::from_secs(30));
        assert_eq!(fetch.page_ttl, Duration::from_secs(3600));

        let search = config.search.settings(config.cache.query_ttl());
        assert_eq!(search.max_links, 10);
        assert_eq!(search.result_ttl, Duration::from_secs(1800));
    }

    #[test]
    fn cache_sections_convert_to_byte_capacity() {
        let cache = CacheConfig::default();
        assert_eq!(cache.page_cache().max_capacity_bytes, 64 * 1024 * 1024);
        assert_eq!(cache.query_cache().max_capacity_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn blank_api_key_does_not_enable_search() {
        let mut search = SearchConfig::default();
        search.brave.brave_api_key = Some("   ".to_string());
        assert!(!search.is_enabled());
    }
}
