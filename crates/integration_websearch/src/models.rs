//! Web search data models

/// A single ranked search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub url: String,
    /// Position in search results (1-indexed)
    pub position: u32,
}

impl SearchResult {
    #[must_use]
    pub const fn new(url: String, position: u32) -> Self {
        Self { url, position }
    }
}
