//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod in_memory_message_store;
mod ollama_generation_adapter;
mod page_fetch_adapter;
mod retrying_generation_adapter;
mod websearch_adapter;

pub use in_memory_message_store::InMemoryMessageStore;
pub use ollama_generation_adapter::OllamaGenerationAdapter;
pub use page_fetch_adapter::PageFetchAdapter;
pub use retrying_generation_adapter::RetryingGenerationAdapter;
pub use websearch_adapter::WebSearchAdapter;
