//! Infrastructure layer - Adapters for external systems
//!
//! Implements the application ports: Moka caches, the Brave search and page
//! fetch adapters, the Ollama generation adapter with its retry decorator,
//! and an in-process message store. Also owns configuration loading and
//! tracing setup.

pub mod adapters;
pub mod cache;
pub mod config;
pub mod retry;
pub mod telemetry;

pub use adapters::*;
pub use cache::{MokaCache, MokaCacheConfig};
pub use config::{
    AppConfig, CacheConfig, FetchConfig, LogFormat, LoggingConfig, SearchConfig,
};
pub use retry::{RetryConfig, RetryError, RetryResult, Retryable, with_retry};
pub use telemetry::{TelemetryError, init_tracing};
