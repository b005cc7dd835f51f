//! Web search adapter - Implements SearchPort using integration_websearch

use std::sync::Arc;

use application::{error::ApplicationError, ports::SearchPort};
use async_trait::async_trait;
use domain::SourceLink;
use integration_websearch::{
    BraveSearchClient, SearchProvider, SearchResult, WebSearchConfig, WebSearchError,
};
use tracing::{debug, instrument};

/// Turns provider results into fetchable source links
pub struct WebSearchAdapter {
    provider: Arc<dyn SearchProvider>,
}

impl std::fmt::Debug for WebSearchAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSearchAdapter")
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

impl WebSearchAdapter {
    /// Create an adapter backed by Brave Search
    pub fn new(config: &WebSearchConfig) -> Result<Self, ApplicationError> {
        let client = BraveSearchClient::new(config).map_err(Self::map_error)?;
        Ok(Self::with_provider(Arc::new(client)))
    }

    pub fn with_provider(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Map integration web search error to application error
    fn map_error(err: WebSearchError) -> ApplicationError {
        match err {
            WebSearchError::RateLimitExceeded { retry_after_secs } => {
                debug!(retry_after = ?retry_after_secs, "Web search rate limited");
                ApplicationError::RateLimited
            },
            WebSearchError::InvalidQuery(e) => {
                ApplicationError::Domain(domain::DomainError::InvalidQuery(e))
            },
            WebSearchError::ConfigurationError(e) | WebSearchError::AuthenticationFailed(e) => {
                ApplicationError::Configuration(e)
            },
            other => ApplicationError::SearchUnavailable(other.to_string()),
        }
    }

    /// Keep results with a usable http(s) URL, in rank order
    fn to_links(results: Vec<SearchResult>) -> Vec<SourceLink> {
        results
            .into_iter()
            .filter_map(|r| match SourceLink::parse(&r.url) {
                Ok(link) => Some(link),
                Err(e) => {
                    debug!(position = r.position, error = %e, "Skipping unusable search result");
                    None
                },
            })
            .collect()
    }
}

#[async_trait]
impl SearchPort for WebSearchAdapter {
    #[instrument(
        skip(self, query),
        fields(query_len = query.len(), provider = self.provider.provider_name())
    )]
    async fn search(
        &self,
        query: &str,
        max_links: usize,
    ) -> Result<Vec<SourceLink>, ApplicationError> {
        let results = self
            .provider
            .search(query, max_links)
            .await
            .map_err(Self::map_error)?;

        let links = Self::to_links(results);
        debug!(links = links.len(), "Retrieved search results");
        Ok(links)
    }
}
