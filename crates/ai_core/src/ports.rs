//! Port definitions for the generation backend

use std::pin::Pin;

use async_trait::async_trait;
use domain::ChatMessage;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// Request for a streamed answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub messages: Vec<InferenceMessage>,
    /// Model to use (overrides config default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A message in chat format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceMessage {
    pub role: String,
    pub content: String,
}

impl InferenceMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for InferenceMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self::new(msg.role.as_str(), msg.content.clone())
    }
}

impl InferenceRequest {
    pub fn new(messages: Vec<InferenceMessage>) -> Self {
        Self {
            messages,
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Single user turn
    pub fn simple(user_message: impl Into<String>) -> Self {
        Self::new(vec![InferenceMessage::new("user", user_message)])
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub const fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// One parsed line of a streaming answer
///
/// `content` is whatever the server sent for this line. Depending on the
/// backend that is either the next piece of text or the whole answer so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingChunk {
    pub content: String,
    /// Set on the final line
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Stream of parsed chunks for one answer
pub type StreamingResponse =
    Pin<Box<dyn Stream<Item = Result<StreamingChunk, InferenceError>> + Send>>;

/// Generation backends
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Open a streaming answer
    ///
    /// Resolves once the server accepted the request; chunks follow on the
    /// returned stream.
    async fn generate_stream(
        &self,
        request: InferenceRequest,
    ) -> Result<StreamingResponse, InferenceError>;

    /// Check if the server answers at all
    async fn health_check(&self) -> Result<bool, InferenceError>;

    fn default_model(&self) -> &str;
}
