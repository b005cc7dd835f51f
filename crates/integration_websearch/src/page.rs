//! Page fetching and text extraction

use std::time::Duration;

use reqwest::{
    Client,
    header::{CONTENT_TYPE, REFERER},
};
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use crate::{config::PageFetchConfig, error::WebSearchError};

/// Paragraphs inside the main content of a page
const CONTENT_PARAGRAPHS: &str = "article p, main p";
const ALL_PARAGRAPHS: &str = "p";

/// Reduces an HTML document to its readable paragraphs
#[derive(Debug, Clone)]
pub struct TextExtractor {
    content: Selector,
    fallback: Selector,
    min_paragraph_chars: usize,
}

impl TextExtractor {
    pub fn new(min_paragraph_chars: usize) -> Result<Self, WebSearchError> {
        let parse = |css: &str| {
            Selector::parse(css)
                .map_err(|e| WebSearchError::ConfigurationError(format!("selector {css}: {e}")))
        };
        Ok(Self {
            content: parse(CONTENT_PARAGRAPHS)?,
            fallback: parse(ALL_PARAGRAPHS)?,
            min_paragraph_chars,
        })
    }

    /// Extract paragraph text, one paragraph per line
    ///
    /// Paragraphs under `<article>` or `<main>` are preferred; when none is
    /// long enough every `<p>` on the page is considered instead. Returns an
    /// empty string when nothing qualifies.
    pub fn extract(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let mut paragraphs = self.paragraphs(&document, &self.content);
        if paragraphs.is_empty() {
            paragraphs = self.paragraphs(&document, &self.fallback);
        }
        paragraphs.join("\n")
    }

    fn paragraphs(&self, document: &Html, selector: &Selector) -> Vec<String> {
        document
            .select(selector)
            .map(|p| collapse_whitespace(&p.text().collect::<String>()))
            .filter(|text| text.chars().count() > self.min_paragraph_chars)
            .collect()
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Downloads pages and returns their readable text
#[derive(Debug)]
pub struct PageFetcher {
    client: Client,
    referrer: Option<String>,
    timeout_secs: u64,
    extractor: TextExtractor,
}

impl PageFetcher {
    pub fn new(config: &PageFetchConfig) -> Result<Self, WebSearchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WebSearchError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            referrer: config.referrer.clone(),
            timeout_secs: config.timeout_secs,
            extractor: TextExtractor::new(config.min_paragraph_chars)?,
        })
    }

    /// GET `url` and extract its text
    ///
    /// Non-success statuses and content that is neither HTML nor plain text
    /// are errors. A page without qualifying paragraphs yields `Ok("")`.
    #[instrument(skip(self))]
    pub async fn fetch_text(&self, url: &str) -> Result<String, WebSearchError> {
        let mut request = self.client.get(url);
        if let Some(referrer) = &self.referrer {
            request = request.header(REFERER, referrer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| WebSearchError::from_transport(&e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebSearchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase());
        let kind = ContentKind::classify(content_type.as_deref())?;

        let body = response
            .text()
            .await
            .map_err(|e| WebSearchError::from_transport(&e, self.timeout_secs))?;

        let text = match kind {
            ContentKind::Html => self.extractor.extract(&body),
            ContentKind::PlainText => collapse_whitespace(&body),
        };
        debug!(body_len = body.len(), text_len = text.len(), "Page fetched");
        Ok(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    Html,
    PlainText,
}

impl ContentKind {
    /// Missing content types are treated as HTML
    fn classify(mime: Option<&str>) -> Result<Self, WebSearchError> {
        match mime {
            None | Some("text/html" | "application/xhtml+xml") => Ok(Self::Html),
            Some("text/plain") => Ok(Self::PlainText),
            Some(other) => Err(WebSearchError::UnsupportedContent(other.to_string())),
        }
    }
}
