//! Page-fetch transport port

use async_trait::async_trait;
use domain::SourceLink;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for retrieving a page and extracting its readable text
///
/// Implementations own transport concerns (timeouts, user agent, HTML
/// parsing). Dropping the returned future must abort the request.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PageFetchPort: Send + Sync {
    /// Fetch `link` and return its extracted text, possibly empty
    async fn fetch_text(&self, link: &SourceLink) -> Result<String, ApplicationError>;
}
