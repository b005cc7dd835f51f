//! Events delivered to the caller of a streamed answer

use serde::{Deserialize, Serialize};

/// One event on the live answer channel
///
/// A well-formed stream is zero or more `Delta` events followed by exactly
/// one terminal `Done` or `Error`. Text already delivered in deltas is never
/// retracted, so a stream ending in `Error` is a valid partial answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Newly generated text not previously delivered
    Delta {
        /// The increment
        content: String,
    },
    /// The answer completed successfully
    Done,
    /// The answer terminated with an error
    Error {
        /// Human-readable error description
        message: String,
    },
}

impl StreamEvent {
    /// Create a delta event
    pub fn delta(content: impl Into<String>) -> Self {
        Self::Delta {
            content: content.into(),
        }
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this event ends the stream
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}
