//! Source links produced by the search capability
//!
//! A link lives for a single aggregation: it is produced per query, consumed
//! once by the fetch orchestrator and never persisted.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{errors::DomainError, value_objects::CacheKey};

/// A candidate page to fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLink {
    url: String,
}

impl SourceLink {
    /// Create a link from an absolute http(s) URL
    pub fn parse(url: &str) -> Result<Self, DomainError> {
        let parsed = Url::parse(url.trim()).map_err(|e| DomainError::InvalidUrl(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(Self {
                url: parsed.to_string(),
            }),
            other => Err(DomainError::InvalidUrl(format!(
                "unsupported scheme '{other}'"
            ))),
        }
    }

    /// The absolute URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Host part of the URL, for logging
    #[must_use]
    pub fn host(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(ToString::to_string))
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Page-cache key for this link
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_url(&self.url)
    }
}

impl fmt::Display for SourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
