//! Value Objects - Immutable, identity-less domain primitives

mod cache_key;
mod conversation_id;

pub use cache_key::{CacheKey, CacheNamespace, canonical_query};
pub use conversation_id::ConversationId;
