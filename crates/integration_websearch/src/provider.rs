//! Search provider trait

use async_trait::async_trait;

use crate::{SearchResult, WebSearchError};

/// Web search backends
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `query`, returning at most `max_results` ranked results
    ///
    /// An empty list is a valid answer, not an error.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, WebSearchError>;

    /// Get the provider name (e.g., "brave")
    fn provider_name(&self) -> &'static str;
}
