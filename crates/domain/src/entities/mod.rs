//! Domain entities - Objects with identity and lifecycle

mod chat_message;
mod source_link;
mod stream_event;

pub use chat_message::{ChatMessage, MessageMetadata, MessageRole};
pub use source_link::SourceLink;
pub use stream_event::StreamEvent;
