//! Search configuration

use std::time::Duration;

use application::SearchSettings;
use integration_websearch::WebSearchConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Links requested per query (default: 10)
    #[serde(default = "default_max_links")]
    pub max_links: usize,

    /// Brave Search API settings
    #[serde(default)]
    pub brave: WebSearchConfig,
}

const fn default_max_links() -> usize {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_links: default_max_links(),
            brave: WebSearchConfig::default(),
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub const fn settings(&self, result_ttl: Duration) -> SearchSettings {
        SearchSettings {
            max_links: self.max_links,
            result_ttl,
        }
    }

    /// Whether an API key is configured
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.brave
            .brave_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_links == 0 {
            return Err("search.max_links must be greater than 0".to_string());
        }
        self.brave.validate().map_err(|e| format!("search.brave.{e}"))
    }
}
