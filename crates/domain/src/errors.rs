//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// URL could not be parsed or uses an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Search query is empty after normalization
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_error_message() {
        let err = DomainError::InvalidUrl("ftp://nope".to_string());
        assert_eq!(err.to_string(), "Invalid URL: ftp://nope");
    }

    #[test]
    fn invalid_query_error_message() {
        let err = DomainError::InvalidQuery("query is empty".to_string());
        assert_eq!(err.to_string(), "Invalid query: query is empty");
    }

    #[test]
    fn errors_are_cloneable() {
        let err = DomainError::InvalidQuery("bad".to_string());
        assert_eq!(err.clone(), err);
    }
}
