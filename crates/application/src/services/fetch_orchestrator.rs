//! Fetch orchestrator
//!
//! Turns a batch of source links into extracted page texts with bounded
//! parallelism. Individual failures are logged and dropped; the batch only
//! fails when it is cancelled before it starts.

use std::{collections::HashSet, sync::Arc, time::Duration};

use domain::{CacheKey, SourceLink};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::{
    coalescer::RequestCoalescer,
    error::ApplicationError,
    ports::{CachePort, CachePortExt, PageFetchPort, ttl},
};

/// Coalescer shared by every batch fetching pages
pub type PageCoalescer = RequestCoalescer<String, ApplicationError>;

/// Tuning for a fetch batch
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Maximum number of page fetches executing at once
    pub max_concurrency: usize,
    /// Deadline for the whole batch
    pub batch_timeout: Duration,
    /// TTL for cached page text
    pub page_ttl: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            batch_timeout: Duration::from_secs(30),
            page_ttl: ttl::PAGE_CONTENT,
        }
    }
}

/// Fetches pages concurrently behind an admission gate
pub struct FetchOrchestrator {
    fetcher: Arc<dyn PageFetchPort>,
    cache: Arc<dyn CachePort>,
    coalescer: Arc<PageCoalescer>,
    settings: FetchSettings,
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("cache", &self.cache)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl FetchOrchestrator {
    /// Create an orchestrator with its own page coalescer
    pub fn new(
        fetcher: Arc<dyn PageFetchPort>,
        cache: Arc<dyn CachePort>,
        settings: FetchSettings,
    ) -> Self {
        Self::with_coalescer(
            fetcher,
            cache,
            Arc::new(RequestCoalescer::new("page")),
            settings,
        )
    }

    /// Create an orchestrator sharing an existing page coalescer
    pub fn with_coalescer(
        fetcher: Arc<dyn PageFetchPort>,
        cache: Arc<dyn CachePort>,
        coalescer: Arc<PageCoalescer>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            fetcher,
            cache,
            coalescer,
            settings,
        }
    }

    /// Fetch every link and return the non-empty extracted texts
    ///
    /// Order of the result is not significant. Returns
    /// [`ApplicationError::Cancelled`] only when `cancel` fired before the
    /// batch started; a later cancellation or the batch deadline yields
    /// whatever completed so far.
    #[instrument(skip_all, fields(links = links.len()))]
    pub async fn fetch_all(
        &self,
        links: &[SourceLink],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ApplicationError> {
        if cancel.is_cancelled() {
            return Err(ApplicationError::Cancelled);
        }

        let batch = cancel.child_token();
        let gate = Semaphore::new(self.settings.max_concurrency.max(1));
        let mut seen = HashSet::new();
        let mut tasks: FuturesUnordered<_> = links
            .iter()
            .filter(|link| seen.insert(link.url()))
            .map(|link| self.fetch_one(link, &gate, &batch))
            .collect();

        let deadline = tokio::time::sleep(self.settings.batch_timeout);
        tokio::pin!(deadline);

        let mut texts = Vec::with_capacity(tasks.len());
        let mut failed = 0usize;
        loop {
            tokio::select! {
                next = tasks.next() => match next {
                    Some(Ok(text)) if !text.trim().is_empty() => texts.push(text),
                    Some(Ok(_) | Err(ApplicationError::Cancelled)) => {},
                    Some(Err(e)) => {
                        failed += 1;
                        warn!(error = %e, "Page fetch failed, dropping source");
                    },
                    None => break,
                },
                () = &mut deadline, if !batch.is_cancelled() => {
                    warn!(
                        timeout_secs = self.settings.batch_timeout.as_secs(),
                        "Fetch batch deadline elapsed, returning partial results"
                    );
                    batch.cancel();
                },
            }
        }

        debug!(
            fetched = texts.len(),
            failed,
            cancelled = batch.is_cancelled(),
            "Fetch batch finished"
        );
        Ok(texts)
    }

    async fn fetch_one(
        &self,
        link: &SourceLink,
        gate: &Semaphore,
        cancel: &CancellationToken,
    ) -> Result<String, ApplicationError> {
        let key = link.cache_key();
        let flight_key = key.to_string();
        loop {
            if cancel.is_cancelled() {
                return Err(ApplicationError::Cancelled);
            }
            let result = self
                .coalescer
                .run(&flight_key, || self.load_page(link, &key, gate, cancel))
                .await;
            match result {
                // Another batch led this flight and was cancelled; our batch is still live.
                Err(ApplicationError::Cancelled) if !cancel.is_cancelled() => {},
                other => return other,
            }
        }
    }

    async fn load_page(
        &self,
        link: &SourceLink,
        key: &CacheKey,
        gate: &Semaphore,
        cancel: &CancellationToken,
    ) -> Result<String, ApplicationError> {
        match self.cache.get::<String>(key).await {
            Ok(Some(text)) => {
                debug!(host = %link.host(), "Page cache hit");
                return Ok(text);
            },
            Ok(None) => {},
            Err(e) => debug!(error = %e, "Page cache read failed, treating as miss"),
        }

        let _permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApplicationError::Cancelled),
            permit = gate.acquire() => permit
                .map_err(|_| ApplicationError::Internal("fetch gate closed".to_string()))?,
        };

        let text = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApplicationError::Cancelled),
            text = self.fetcher.fetch_text(link) => text?,
        };

        if !text.trim().is_empty() && !cancel.is_cancelled() {
            if let Err(e) = self.cache.set(key, &text, self.settings.page_ttl).await {
                debug!(error = %e, "Cache write skipped");
            }
        }
        Ok(text)
    }
}
