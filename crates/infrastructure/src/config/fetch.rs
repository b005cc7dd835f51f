//! Page fetching configuration

use std::time::Duration;

use application::FetchSettings;
use integration_websearch::PageFetchConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Page fetches executing at once per batch (default: 3)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Deadline for a whole batch in seconds (default: 30)
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_secs: u64,

    /// HTTP client settings for individual pages
    #[serde(default)]
    pub page: PageFetchConfig,
}

const fn default_max_concurrency() -> usize {
    3
}

const fn default_batch_timeout() -> u64 {
    30
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            batch_timeout_secs: default_batch_timeout(),
            page: PageFetchConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Orchestrator settings, with page TTL taken from the cache section
    #[must_use]
    pub const fn settings(&self, page_ttl: Duration) -> FetchSettings {
        FetchSettings {
            max_concurrency: self.max_concurrency,
            batch_timeout: Duration::from_secs(self.batch_timeout_secs),
            page_ttl,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("fetch.max_concurrency must be greater than 0".to_string());
        }
        if self.batch_timeout_secs == 0 {
            return Err("fetch.batch_timeout_secs must be greater than 0".to_string());
        }
        self.page.validate().map_err(|e| format!("fetch.page.{e}"))
    }
}
