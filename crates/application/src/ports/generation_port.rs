//! Generation capability port
//!
//! The model pipeline is opaque: given prompt inputs it opens a stream of
//! text chunks. Chunks may be cumulative snapshots or deltas; the stream
//! reconciler deals with either.

use std::pin::Pin;

use async_trait::async_trait;
use domain::{ChatMessage, MessageRole};
use futures::Stream;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ApplicationError;

/// Prompt inputs for a generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Conversation history, oldest first
    pub messages: Vec<ChatMessage>,
    /// Model override (adapter default when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    /// Create a request from a message history
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
        }
    }

    /// Create a single-turn request
    pub fn simple(prompt: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(prompt)])
    }

    /// Create a request with a system prompt
    pub fn with_system(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::system(system), ChatMessage::user(prompt)])
    }

    /// Set the model for this request
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Content of the system prompt, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
    }
}

/// One unit of the model output stream
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationChunk {
    /// Chunk text, either a delta or a cumulative snapshot
    pub content: String,
    /// Model name, when the backend reports it
    pub model: Option<String>,
}

impl GenerationChunk {
    /// Create a chunk with content only
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: None,
        }
    }
}

/// Stream of chunks produced by an opened generation
pub type GenerationStream =
    Pin<Box<dyn Stream<Item = Result<GenerationChunk, ApplicationError>> + Send>>;

/// Port for opening a model output stream
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GenerationPort: Send + Sync {
    /// Open a chunk stream for `request`
    ///
    /// Implementations must return promptly with `Cancelled` once `cancel`
    /// fires. Only the opening is covered here; errors after the stream is
    /// returned arrive as stream items.
    async fn open_stream(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationStream, ApplicationError>;

    /// Default model name
    fn model_name(&self) -> String;
}
