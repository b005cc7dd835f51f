//! Cache implementations
//!
//! `MokaCache` backs both content caches: extracted page text and
//! aggregated search results.

mod moka_cache;

pub use moka_cache::{MokaCache, MokaCacheConfig};
