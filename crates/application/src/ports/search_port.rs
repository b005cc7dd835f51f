//! Search capability port
//!
//! Resolves a query to a bounded list of candidate source links. Snippets
//! and ranking returned by the provider are not used: the aggregation core
//! fetches every page itself.

use async_trait::async_trait;
use domain::SourceLink;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for the external search capability
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SearchPort: Send + Sync {
    /// Return at most `max_links` result links for `query`
    async fn search(
        &self,
        query: &str,
        max_links: usize,
    ) -> Result<Vec<SourceLink>, ApplicationError>;
}
