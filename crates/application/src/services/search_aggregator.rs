//! Search aggregation
//!
//! Entry point of the retrieval path: query → source links → fetched page
//! texts. Results are cached per canonical query and concurrent identical
//! queries share one search and one fetch batch.

use std::{sync::Arc, time::Duration};

use domain::{CacheKey, DomainError, canonical_query};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::fetch_orchestrator::FetchOrchestrator;
use crate::{
    coalescer::RequestCoalescer,
    error::ApplicationError,
    ports::{CachePort, CachePortExt, SearchPort, ttl},
};

/// Coalescer shared by concurrent identical queries
pub type QueryCoalescer = RequestCoalescer<Vec<String>, ApplicationError>;

/// Tuning for query aggregation
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Maximum number of links requested from the search capability
    pub max_links: usize,
    /// TTL for cached snippet lists
    pub result_ttl: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_links: 10,
            result_ttl: ttl::SEARCH_RESULTS,
        }
    }
}

/// Resolves a query into a flat list of page texts
pub struct SearchAggregator {
    search: Arc<dyn SearchPort>,
    orchestrator: Arc<FetchOrchestrator>,
    cache: Arc<dyn CachePort>,
    coalescer: Arc<QueryCoalescer>,
    settings: SearchSettings,
}

impl std::fmt::Debug for SearchAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchAggregator")
            .field("orchestrator", &self.orchestrator)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SearchAggregator {
    pub fn new(
        search: Arc<dyn SearchPort>,
        orchestrator: Arc<FetchOrchestrator>,
        cache: Arc<dyn CachePort>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            search,
            orchestrator,
            cache,
            coalescer: Arc::new(RequestCoalescer::new("query")),
            settings,
        }
    }

    /// Search `query` and return extracted page texts
    ///
    /// Errors from the search capability surface as
    /// [`ApplicationError::SearchUnavailable`]; failures of individual pages
    /// do not. Empty results are returned but never cached.
    #[instrument(skip_all, fields(query_len = query.len()))]
    pub async fn search(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ApplicationError> {
        let canonical = canonical_query(query);
        if canonical.is_empty() {
            return Err(DomainError::InvalidQuery("query is empty".to_string()).into());
        }
        let key = CacheKey::for_query(&canonical);
        if let Some(texts) = self.cached(&key).await {
            debug!(results = texts.len(), "Search cache hit");
            return Ok(texts);
        }

        let flight_key = key.to_string();
        loop {
            if cancel.is_cancelled() {
                return Err(ApplicationError::Cancelled);
            }
            let result = self
                .coalescer
                .run(&flight_key, || self.search_uncached(&canonical, &key, cancel))
                .await;
            match result {
                // Leading caller was cancelled; this caller is still live.
                Err(ApplicationError::Cancelled) if !cancel.is_cancelled() => {},
                other => return other,
            }
        }
    }

    /// Like [`Self::search`], but a failure yields no snippets
    ///
    /// Callers building a prompt proceed without external context rather
    /// than aborting the answer.
    pub async fn search_or_empty(&self, query: &str, cancel: &CancellationToken) -> Vec<String> {
        match self.search(query, cancel).await {
            Ok(texts) => texts,
            Err(e) => {
                warn!(error = %e, "Search failed, continuing without external context");
                Vec::new()
            },
        }
    }

    async fn search_uncached(
        &self,
        query: &str,
        key: &CacheKey,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ApplicationError> {
        // A previous leader may have filled the cache while we queued.
        if let Some(texts) = self.cached(key).await {
            return Ok(texts);
        }

        let links = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApplicationError::Cancelled),
            links = self.search.search(query, self.settings.max_links) => {
                links.map_err(|e| match e {
                    ApplicationError::Cancelled => ApplicationError::Cancelled,
                    ApplicationError::SearchUnavailable(reason) => {
                        ApplicationError::SearchUnavailable(reason)
                    },
                    other => ApplicationError::SearchUnavailable(other.to_string()),
                })?
            },
        };
        let links: Vec<_> = links.into_iter().take(self.settings.max_links).collect();
        debug!(links = links.len(), "Search returned links");

        let texts = self.orchestrator.fetch_all(&links, cancel).await?;
        // A partial batch must not reach followers as a finished result.
        if cancel.is_cancelled() {
            return Err(ApplicationError::Cancelled);
        }

        if texts.is_empty() {
            debug!("No page text extracted, not caching empty result");
        } else if let Err(e) = self.cache.set(key, &texts, self.settings.result_ttl).await {
            debug!(error = %e, "Cache write skipped");
        }
        Ok(texts)
    }

    async fn cached(&self, key: &CacheKey) -> Option<Vec<String>> {
        match self.cache.get::<Vec<String>>(key).await {
            Ok(hit) => hit,
            Err(e) => {
                debug!(error = %e, "Search cache read failed, treating as miss");
                None
            },
        }
    }
}
