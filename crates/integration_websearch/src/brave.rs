//! Brave Search API client
//!
//! Client for the Brave Search API (<https://brave.com/search/api/>).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use crate::{
    config::{MAX_RESULTS_PER_REQUEST, WebSearchConfig},
    error::WebSearchError,
    models::SearchResult,
    provider::SearchProvider,
};

/// Brave Search API response structures
mod api {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct BraveSearchResponse {
        pub web: Option<WebResults>,
    }

    #[derive(Debug, Deserialize)]
    pub struct WebResults {
        #[serde(default)]
        pub results: Vec<WebResult>,
    }

    #[derive(Debug, Deserialize)]
    pub struct WebResult {
        pub url: String,
    }
}

/// Brave Search API client
#[derive(Debug)]
pub struct BraveSearchClient {
    client: Client,
    api_key: String,
    base_url: String,
    safe_search: String,
    result_country: String,
    timeout_secs: u64,
}

impl BraveSearchClient {
    /// Create a new Brave Search client
    ///
    /// Fails if the API key is missing or the HTTP client cannot be built.
    pub fn new(config: &WebSearchConfig) -> Result<Self, WebSearchError> {
        let api_key = config.brave_api_key.clone().ok_or_else(|| {
            WebSearchError::ConfigurationError("Brave API key is required".to_string())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WebSearchError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.brave_base_url.trim_end_matches('/').to_string(),
            safe_search: config.safe_search.clone(),
            result_country: config.result_country.to_lowercase(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn query_params(&self, query: &str, count: usize) -> Vec<(&'static str, String)> {
        vec![
            ("q", query.to_string()),
            ("count", count.clamp(1, MAX_RESULTS_PER_REQUEST).to_string()),
            ("safesearch", self.safe_search.clone()),
            ("country", self.result_country.clone()),
        ]
    }

    fn convert_results(
        response: api::BraveSearchResponse,
        max_results: usize,
    ) -> Vec<SearchResult> {
        response
            .web
            .map(|web| {
                web.results
                    .into_iter()
                    .take(max_results)
                    .zip(1u32..)
                    .map(|(r, position)| SearchResult::new(r.url, position))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchProvider for BraveSearchClient {
    #[instrument(skip(self, query), fields(provider = "brave", query_len = query.len()))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, WebSearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WebSearchError::InvalidQuery(
                "Search query cannot be empty".to_string(),
            ));
        }
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let response = self
            .client
            .get(format!("{}/web/search", self.base_url))
            .query(&self.query_params(query, max_results))
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| WebSearchError::from_transport(&e, self.timeout_secs))?;

        let status = response.status();
        debug!(status = %status, "Received Brave Search response");

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse().ok());

            return Err(WebSearchError::RateLimitExceeded {
                retry_after_secs: retry_after,
            });
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(WebSearchError::AuthenticationFailed(
                "Invalid Brave API key".to_string(),
            ));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(WebSearchError::RequestFailed(format!(
                "HTTP {status}: {error_text}"
            )));
        }

        let api_response: api::BraveSearchResponse = response
            .json()
            .await
            .map_err(|e| WebSearchError::ParseError(e.to_string()))?;

        let results = Self::convert_results(api_response, max_results);
        debug!(
            results = results.len(),
            time_ms = start.elapsed().as_millis(),
            "Brave Search completed"
        );

        Ok(results)
    }

    fn provider_name(&self) -> &'static str {
        "brave"
    }
}
