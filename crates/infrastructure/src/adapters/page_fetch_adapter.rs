//! Page fetch adapter - Implements PageFetchPort using integration_websearch

use application::{error::ApplicationError, ports::PageFetchPort};
use async_trait::async_trait;
use domain::SourceLink;
use integration_websearch::{PageFetchConfig, PageFetcher, WebSearchError};
use tracing::instrument;

#[derive(Debug)]
pub struct PageFetchAdapter {
    fetcher: PageFetcher,
}

impl PageFetchAdapter {
    pub fn new(config: &PageFetchConfig) -> Result<Self, ApplicationError> {
        let fetcher = PageFetcher::new(config)
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self { fetcher })
    }

    /// Every page failure is transient from the caller's point of view
    fn map_error(link: &SourceLink, err: &WebSearchError) -> ApplicationError {
        ApplicationError::ExternalService(format!("{}: {err}", link.host()))
    }
}

#[async_trait]
impl PageFetchPort for PageFetchAdapter {
    #[instrument(skip(self), fields(host = %link.host()))]
    async fn fetch_text(&self, link: &SourceLink) -> Result<String, ApplicationError> {
        self.fetcher
            .fetch_text(link.url())
            .await
            .map_err(|e| Self::map_error(link, &e))
    }
}
