//! Web search and page fetch configuration

use serde::{Deserialize, Serialize};

/// Brave Search API limit on results per request
pub(crate) const MAX_RESULTS_PER_REQUEST: usize = 20;

/// Configuration for the search API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    /// Brave Search API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brave_api_key: Option<String>,

    #[serde(default = "default_brave_base_url")]
    pub brave_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Safe search level: "off", "moderate", "strict"
    #[serde(default = "default_safe_search")]
    pub safe_search: String,

    /// Preferred result country (ISO 3166-1 alpha-2 code, e.g., "US", "DE")
    #[serde(default = "default_result_country")]
    pub result_country: String,
}

fn default_brave_base_url() -> String {
    "https://api.search.brave.com/res/v1".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_safe_search() -> String {
    "moderate".to_string()
}

fn default_result_country() -> String {
    "US".to_string()
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            brave_api_key: None,
            brave_base_url: default_brave_base_url(),
            timeout_secs: default_timeout_secs(),
            safe_search: default_safe_search(),
            result_country: default_result_country(),
        }
    }
}

impl WebSearchConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        let valid_safe_search = ["off", "moderate", "strict"];
        if !valid_safe_search.contains(&self.safe_search.as_str()) {
            return Err(format!(
                "safe_search must be one of: {}",
                valid_safe_search.join(", ")
            ));
        }

        if self.result_country.len() != 2 {
            return Err("result_country must be a two-letter country code".to_string());
        }

        Ok(())
    }
}

/// Configuration for fetching result pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFetchConfig {
    /// `User-Agent` header sent with every page request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional `Referer` header
    #[serde(default)]
    pub referrer: Option<String>,

    /// Per-page timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Paragraphs with this many characters or fewer are dropped
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,
}

fn default_user_agent() -> String {
    format!("lodestar/{}", env!("CARGO_PKG_VERSION"))
}

const fn default_min_paragraph_chars() -> usize {
    50
}

impl Default for PageFetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            referrer: None,
            timeout_secs: default_timeout_secs(),
            min_paragraph_chars: default_min_paragraph_chars(),
        }
    }
}

impl PageFetchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_search_config() {
        let config = WebSearchConfig::default();
        assert!(config.brave_api_key.is_none());
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.safe_search, "moderate");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_safe_search_is_rejected() {
        let config = WebSearchConfig {
            safe_search: "extreme".to_string(),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("safe_search"));
    }

    #[test]
    fn invalid_country_is_rejected() {
        let config = WebSearchConfig {
            result_country: "Germany".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_page_fetch_config() {
        let config = PageFetchConfig::default();
        assert!(config.user_agent.starts_with("lodestar/"));
        assert!(config.referrer.is_none());
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.min_paragraph_chars, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn page_fetch_config_from_partial_json() {
        let config: PageFetchConfig =
            serde_json::from_str(r#"{"referrer": "https://www.google.com/"}"#).unwrap();
        assert_eq!(config.referrer.as_deref(), Some("https://www.google.com/"));
        assert_eq!(config.min_paragraph_chars, 50);
    }
}
