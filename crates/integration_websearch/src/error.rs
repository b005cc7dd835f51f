//! Web search and page fetch error types

use thiserror::Error;

/// Errors from the search API or while fetching pages
#[derive(Debug, Error)]
pub enum WebSearchError {
    /// Connection to the remote host failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Failed to parse the response body
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Search query is invalid or empty
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// API key is missing or invalid
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimitExceeded {
        /// Seconds to wait before retrying (if provided by API)
        retry_after_secs: Option<u64>,
    },

    /// Page answered with a non-success status
    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    /// Page is neither HTML nor plain text
    #[error("Unsupported content type: {0}")]
    UnsupportedContent(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },
}

impl WebSearchError {
    /// Classify a transport error, reporting `timeout_secs` on timeouts
    pub(crate) fn from_transport(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_secs }
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }

    /// Returns true if the same request may succeed later
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed(_)
            | Self::RequestFailed(_)
            | Self::Timeout { .. }
            | Self::RateLimitExceeded { .. } => true,
            Self::HttpStatus { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
