//! Generation errors

use thiserror::Error;

/// Errors talking to the generation server
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Server unreachable
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request rejected or aborted
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Model not found or not pulled
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// A line of the response could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Inference timed out")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimited,

    /// Non-success status from the server
    #[error("Server error: {0}")]
    ServerError(String),

    /// The stream broke after it was opened
    #[error("Stream error: {0}")]
    StreamError(String),
}

impl InferenceError {
    /// Whether opening the stream again may succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::Timeout | Self::RateLimited | Self::ServerError(_)
        )
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}
