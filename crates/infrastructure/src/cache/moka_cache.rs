//! Moka in-memory cache implementation
//!
//! Byte-weighted, thread-safe cache with a time-to-live chosen per entry.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use application::{
    error::ApplicationError,
    ports::{CachePort, CacheStats, ttl},
};
use async_trait::async_trait;
use domain::CacheKey;
use moka::{Expiry, future::Cache};
use tracing::{debug, instrument};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Configuration for Moka cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MokaCacheConfig {
    /// Maximum aggregate weight in bytes
    pub max_capacity_bytes: u64,
    /// TTL the owning service should pass to `set_bytes`
    pub default_ttl: Duration,
}

impl MokaCacheConfig {
    pub const fn from_mb(max_capacity_mb: u64, default_ttl: Duration) -> Self {
        Self {
            max_capacity_bytes: max_capacity_mb * BYTES_PER_MB,
            default_ttl,
        }
    }
}

impl Default for MokaCacheConfig {
    fn default() -> Self {
        Self::from_mb(64, ttl::PAGE_CONTENT)
    }
}

/// Stored value together with the TTL it was written with
#[derive(Debug, Clone)]
struct CachedBytes {
    bytes: Vec<u8>,
    ttl: Duration,
}

/// Expires each entry after the TTL given when it was last written
struct PerEntryTtl;

impl Expiry<CacheKey, CachedBytes> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CachedBytes,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CachedBytes,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-based in-memory cache
///
/// Entries are weighed by their encoded size; once the aggregate weight
/// exceeds the capacity moka evicts by its admission policy. Expired entries
/// are never returned, even before they are physically evicted.
pub struct MokaCache {
    cache: Cache<CacheKey, CachedBytes>,
    config: MokaCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for MokaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("entries", &self.cache.entry_count())
            .field("weighted_bytes", &self.cache.weighted_size())
            .field("capacity_bytes", &self.config.max_capacity_bytes)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl MokaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MokaCacheConfig::default())
    }

    #[must_use]
    pub fn with_config(config: MokaCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity_bytes)
            .weigher(|key: &CacheKey, value: &CachedBytes| -> u32 {
                let weight = key.digest().len() + value.bytes.len();
                weight.try_into().unwrap_or(u32::MAX)
            })
            .expire_after(PerEntryTtl)
            .build();

        Self {
            cache,
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache for extracted page text (64 MB, 60 minutes)
    #[must_use]
    pub fn for_page_content() -> Self {
        Self::with_config(MokaCacheConfig::from_mb(64, ttl::PAGE_CONTENT))
    }

    /// Cache for aggregated search results (16 MB, 30 minutes)
    #[must_use]
    pub fn for_search_results() -> Self {
        Self::with_config(MokaCacheConfig::from_mb(16, ttl::SEARCH_RESULTS))
    }

    pub const fn config(&self) -> &MokaCacheConfig {
        &self.config
    }

    /// Flush pending evictions so counts and weights are current
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for MokaCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CachePort for MokaCache {
    #[instrument(skip(self), fields(key = %key), level = "debug")]
    async fn get_bytes(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, ApplicationError> {
        if let Some(entry) = self.cache.get(key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit");
            Ok(Some(entry.bytes))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache miss");
            Ok(None)
        }
    }

    #[instrument(skip(self, value), fields(key = %key, len = value.len()), level = "debug")]
    async fn set_bytes(
        &self,
        key: &CacheKey,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), ApplicationError> {
        if value.len() as u64 > self.config.max_capacity_bytes {
            debug!("cache write skipped: value exceeds capacity");
            return Ok(());
        }
        self.cache
            .insert(key.clone(), CachedBytes { bytes: value, ttl })
            .await;
        debug!(ttl_secs = ttl.as_secs(), "Cache set");
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
            weighted_bytes: self.cache.weighted_size(),
        }
    }
}
