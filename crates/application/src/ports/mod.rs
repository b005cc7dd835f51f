//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod cache_port;
mod generation_port;
mod message_store;
mod page_fetch_port;
mod search_port;

pub use cache_port::{CachePort, CachePortExt, CacheStats, ttl};
#[cfg(test)]
pub use generation_port::MockGenerationPort;
pub use generation_port::{GenerationChunk, GenerationPort, GenerationRequest, GenerationStream};
#[cfg(test)]
pub use message_store::MockMessageStorePort;
pub use message_store::MessageStorePort;
#[cfg(test)]
pub use page_fetch_port::MockPageFetchPort;
pub use page_fetch_port::PageFetchPort;
#[cfg(test)]
pub use search_port::MockSearchPort;
pub use search_port::SearchPort;
