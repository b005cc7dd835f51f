//! Cache sizing and TTL configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::MokaCacheConfig;

/// Sizes and lifetimes of the page and query caches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Capacity of the page text cache in MB (default: 64)
    #[serde(default = "default_page_capacity_mb")]
    pub page_capacity_mb: u64,

    /// TTL of cached page text in seconds (default: 1 hour)
    #[serde(default = "default_page_ttl")]
    pub page_ttl_secs: u64,

    /// Capacity of the search result cache in MB (default: 16)
    #[serde(default = "default_query_capacity_mb")]
    pub query_capacity_mb: u64,

    /// TTL of cached search results in seconds (default: 30 minutes)
    #[serde(default = "default_query_ttl")]
    pub query_ttl_secs: u64,
}

const fn default_page_capacity_mb() -> u64 {
    64
}

const fn default_page_ttl() -> u64 {
    60 * 60
}

const fn default_query_capacity_mb() -> u64 {
    16
}

const fn default_query_ttl() -> u64 {
    30 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            page_capacity_mb: default_page_capacity_mb(),
            page_ttl_secs: default_page_ttl(),
            query_capacity_mb: default_query_capacity_mb(),
            query_ttl_secs: default_query_ttl(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_secs)
    }

    #[must_use]
    pub const fn query_ttl(&self) -> Duration {
        Duration::from_secs(self.query_ttl_secs)
    }

    #[must_use]
    pub const fn page_cache(&self) -> MokaCacheConfig {
        MokaCacheConfig::from_mb(self.page_capacity_mb, self.page_ttl())
    }

    #[must_use]
    pub const fn query_cache(&self) -> MokaCacheConfig {
        MokaCacheConfig::from_mb(self.query_capacity_mb, self.query_ttl())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.page_capacity_mb == 0 || self.query_capacity_mb == 0 {
            return Err("cache capacities must be greater than 0".to_string());
        }
        if self.page_ttl_secs == 0 || self.query_ttl_secs == 0 {
            return Err("cache TTLs must be greater than 0".to_string());
        }
        Ok(())
    }
}
