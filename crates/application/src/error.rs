//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
///
/// Errors are `Clone` because a coalesced computation hands the same result
/// to every caller attached to it.
#[derive(Debug, Clone, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Inference/AI backend error
    #[error("Inference error: {0}")]
    Inference(String),

    /// External service error (a single page fetch, a transport failure)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// The search capability itself failed
    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    /// Opening the generation stream failed after all attempts
    #[error("Failed to open generation stream after {attempts} attempt(s): {reason}")]
    GenerationOpenFailed { attempts: u32, reason: String },

    /// The generation stream failed after it had started
    #[error("Generation stream error: {0}")]
    GenerationStream(String),

    /// The operation was cancelled by the caller or a deadline
    #[error("Operation cancelled")]
    Cancelled,

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error reports cancellation
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
