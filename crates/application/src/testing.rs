//! In-memory fakes shared by service tests

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use domain::{CacheKey, SourceLink};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::{
    error::ApplicationError,
    ports::{CachePort, CacheStats, PageFetchPort},
};

/// Cache honouring TTL against tokio's clock, counting writes
#[derive(Debug, Default)]
pub struct FakeCache {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
    pub writes: AtomicUsize,
}

impl FakeCache {
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .lock()
            .get(&key.to_string())
            .is_some_and(|(_, expires)| *expires > Instant::now())
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CachePort for FakeCache {
    async fn get_bytes(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, ApplicationError> {
        Ok(self
            .entries
            .lock()
            .get(&key.to_string())
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(bytes, _)| bytes.clone()))
    }

    async fn set_bytes(
        &self,
        key: &CacheKey,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), ApplicationError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.lock().len() as u64,
            ..CacheStats::default()
        }
    }
}

/// How the fake fetcher answers a URL
#[derive(Debug, Clone)]
pub enum PageScript {
    Text(String, Duration),
    Fail(Duration),
}

/// Page fetcher driven by a per-URL script, tracking concurrency
#[derive(Debug, Default)]
pub struct FakeFetcher {
    scripts: HashMap<String, PageScript>,
    pub calls: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, url: &str, text: &str, delay: Duration) -> Self {
        self.scripts
            .insert(url.to_string(), PageScript::Text(text.to_string(), delay));
        self
    }

    #[must_use]
    pub fn with_failure(mut self, url: &str, delay: Duration) -> Self {
        self.scripts
            .insert(url.to_string(), PageScript::Fail(delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageFetchPort for FakeFetcher {
    async fn fetch_text(&self, link: &SourceLink) -> Result<String, ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let _active = ActiveGuard(&self.active);

        match self.scripts.get(link.url()).cloned() {
            Some(PageScript::Text(text, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            },
            Some(PageScript::Fail(delay)) => {
                tokio::time::sleep(delay).await;
                Err(ApplicationError::ExternalService(format!(
                    "HTTP 500 for {}",
                    link.url()
                )))
            },
            None => Err(ApplicationError::ExternalService("unknown url".to_string())),
        }
    }
}

pub fn link(url: &str) -> SourceLink {
    SourceLink::parse(url).unwrap()
}
