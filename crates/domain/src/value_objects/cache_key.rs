//! Content-addressed cache keys
//!
//! Keys are derived from a 128-bit blake3 digest of the canonical input so
//! that key size is constant regardless of input length and raw query text
//! never shows up in logs or metrics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of digest bytes kept in a key (128 bits)
const DIGEST_BYTES: usize = 16;

/// Logical cache a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheNamespace {
    /// Extracted text of a single fetched page, keyed by URL
    Page,
    /// Aggregated snippet list, keyed by search query
    Query,
}

impl CacheNamespace {
    /// Prefix used in the rendered key
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Query => "query",
        }
    }
}

/// A fixed-size cache key: namespace plus hex-encoded 128-bit digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    namespace: CacheNamespace,
    digest: String,
}

impl CacheKey {
    /// Key for the extracted content of a URL (hashed verbatim)
    #[must_use]
    pub fn for_url(url: &str) -> Self {
        Self::derive(CacheNamespace::Page, url.trim())
    }

    /// Key for the snippet list of a search query
    ///
    /// The query is canonicalized first so that casing and whitespace
    /// differences map onto the same entry.
    #[must_use]
    pub fn for_query(query: &str) -> Self {
        Self::derive(CacheNamespace::Query, &canonical_query(query))
    }

    fn derive(namespace: CacheNamespace, input: &str) -> Self {
        let hash = blake3::hash(input.as_bytes());
        let digest = hash.to_hex()[..DIGEST_BYTES * 2].to_string();
        Self { namespace, digest }
    }

    /// Namespace of this key
    #[must_use]
    pub const fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    /// Hex digest without the namespace prefix
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace.prefix(), self.digest)
    }
}

/// Canonical form of a search query: trimmed, lowercased, single spaces
#[must_use]
pub fn canonical_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
