//! Integration tests for infrastructure crate
//!
//! Tests cover:
//! - Ollama generation adapter and its retry decorator against WireMock
//! - The retrieval path end to end: Brave search, page fetching, Moka caches

use std::{sync::Arc, time::Duration};

use ai_core::InferenceConfig;
use application::{
    ApplicationError, FetchOrchestrator, FetchSettings, GenerationPort, GenerationRequest,
    SearchAggregator, SearchSettings,
};
use domain::SourceLink;
use futures::StreamExt;
use infrastructure::{
    MokaCache, OllamaGenerationAdapter, PageFetchAdapter, RetryConfig, RetryingGenerationAdapter,
    WebSearchAdapter,
};
use integration_websearch::{PageFetchConfig, WebSearchConfig};
use tokio_util::sync::CancellationToken;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn inference_config(server: &MockServer) -> InferenceConfig {
    InferenceConfig {
        base_url: server.uri(),
        default_model: "test-model".to_string(),
        timeout_ms: 5_000,
        ..Default::default()
    }
}

fn ndjson(lines: &[serde_json::Value]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

fn greeting_stream() -> String {
    ndjson(&[
        serde_json::json!({"model": "test-model", "message": {"role": "assistant", "content": "Hi"}, "done": false}),
        serde_json::json!({"model": "test-model", "message": {"role": "assistant", "content": "Hi there"}, "done": false}),
        serde_json::json!({"model": "test-model", "message": {"role": "assistant", "content": " friend"}, "done": false}),
        serde_json::json!({"model": "test-model", "done": true}),
    ])
}

/// Retry settings short enough for real-time tests
fn fast_retry() -> RetryConfig {
    RetryConfig::new(10, 50, 2.0, 2)
}

// ============================================================================
// Generation
// ============================================================================

mod generation_tests {
    use super::*;

    #[tokio::test]
    async fn ollama_adapter_streams_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(greeting_stream()))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = OllamaGenerationAdapter::new(inference_config(&server)).unwrap();
        let stream = adapter
            .open_stream(&GenerationRequest::simple("hello"), &CancellationToken::new())
            .await
            .unwrap();
        let chunks: Vec<_> = stream.collect().await;

        let contents: Vec<_> = chunks
            .into_iter()
            .map(|c| c.unwrap().content)
            .filter(|c| !c.is_empty())
            .collect();
        assert_eq!(contents, vec!["Hi", "Hi there", " friend"]);
        assert_eq!(adapter.model_name(), "test-model");
    }

    #[tokio::test]
    async fn retrying_adapter_recovers_from_unavailable_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(greeting_stream()))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = RetryingGenerationAdapter::new(
            OllamaGenerationAdapter::new(inference_config(&server)).unwrap(),
            fast_retry(),
        );
        let stream = adapter
            .open_stream(&GenerationRequest::simple("hello"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(stream.count().await >= 3);
    }

    #[tokio::test]
    async fn retrying_adapter_reports_exhaustion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let adapter = RetryingGenerationAdapter::new(
            OllamaGenerationAdapter::new(inference_config(&server)).unwrap(),
            fast_retry(),
        );
        let result = adapter
            .open_stream(&GenerationRequest::simple("hello"), &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(ApplicationError::GenerationOpenFailed { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn missing_model_uses_every_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .expect(3)
            .mount(&server)
            .await;

        let adapter = RetryingGenerationAdapter::new(
            OllamaGenerationAdapter::new(inference_config(&server)).unwrap(),
            fast_retry(),
        );
        let result = adapter
            .open_stream(&GenerationRequest::simple("hello"), &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(ApplicationError::GenerationOpenFailed { attempts: 3, .. })
        ));
    }
}

// ============================================================================
// Retrieval
// ============================================================================

mod retrieval_tests {
    use super::*;

    fn article(body: &str) -> String {
        format!(
            "<html><body><nav><p>Navigation links that should never show up in results</p></nav>\
             <article><p>{body}</p></article></body></html>"
        )
    }

    fn html(body: String) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
    }

    async fn mount_page(server: &MockServer, route: &str, body: &str, hits: u64) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html(article(body)))
            .expect(hits)
            .mount(server)
            .await;
    }

    fn page_fetcher() -> Arc<PageFetchAdapter> {
        let config = PageFetchConfig {
            timeout_secs: 5,
            min_paragraph_chars: 10,
            ..Default::default()
        };
        Arc::new(PageFetchAdapter::new(&config).unwrap())
    }

    fn orchestrator() -> Arc<FetchOrchestrator> {
        Arc::new(FetchOrchestrator::new(
            page_fetcher(),
            Arc::new(MokaCache::for_page_content()),
            FetchSettings::default(),
        ))
    }

    fn link(server: &MockServer, route: &str) -> SourceLink {
        SourceLink::parse(&format!("{}{route}", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn batch_keeps_successes_and_caches_pages() {
        let server = MockServer::start().await;
        mount_page(&server, "/a", "Alpha page with enough text to be kept", 1).await;
        mount_page(&server, "/b", "Beta page with enough text to be kept", 1).await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let orchestrator = orchestrator();
        let links = vec![link(&server, "/a"), link(&server, "/missing"), link(&server, "/b")];
        let cancel = CancellationToken::new();

        let mut first = orchestrator.fetch_all(&links, &cancel).await.unwrap();
        first.sort();
        assert_eq!(
            first,
            vec![
                "Alpha page with enough text to be kept",
                "Beta page with enough text to be kept",
            ]
        );

        // Served from the page cache; the mocks above expect a single hit each.
        let second = orchestrator.fetch_all(&links[..1], &cancel).await.unwrap();
        assert_eq!(second, vec!["Alpha page with enough text to be kept"]);
    }

    #[tokio::test]
    async fn search_aggregates_page_texts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .and(query_param("q", "rust async"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "web": {
                    "results": [
                        {"title": "One", "url": format!("{}/one", server.uri()), "description": "first"},
                        {"title": "Two", "url": format!("{}/two", server.uri()), "description": "second"},
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_page(&server, "/one", "Futures are lazy until they are polled", 1).await;
        mount_page(&server, "/two", "Tokio drives futures on a work stealing runtime", 1).await;

        let search = WebSearchAdapter::new(&WebSearchConfig {
            brave_api_key: Some("test-key".to_string()),
            brave_base_url: format!("{}/res/v1", server.uri()),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap();
        let aggregator = SearchAggregator::new(
            Arc::new(search),
            orchestrator(),
            Arc::new(MokaCache::for_search_results()),
            SearchSettings::default(),
        );
        let cancel = CancellationToken::new();

        let mut texts = aggregator.search("  Rust   ASYNC ", &cancel).await.unwrap();
        texts.sort();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].starts_with("Futures"));

        // Same canonical query hits the result cache, not the search API.
        let cached = aggregator.search("rust async", &cancel).await.unwrap();
        assert_eq!(cached.len(), 2);
    }

    #[tokio::test]
    async fn search_failure_surfaces_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let search = WebSearchAdapter::new(&WebSearchConfig {
            brave_api_key: Some("test-key".to_string()),
            brave_base_url: format!("{}/res/v1", server.uri()),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap();
        let aggregator = SearchAggregator::new(
            Arc::new(search),
            orchestrator(),
            Arc::new(MokaCache::for_search_results()),
            SearchSettings::default(),
        );

        let result = aggregator
            .search("rust", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ApplicationError::SearchUnavailable(_))));
    }

    #[tokio::test]
    async fn slow_pages_are_dropped_at_the_batch_deadline() {
        let server = MockServer::start().await;
        mount_page(&server, "/fast", "Fast page that arrives before the deadline", 1).await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                html(article("Slow page that misses the batch deadline"))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let orchestrator = FetchOrchestrator::new(
            page_fetcher(),
            Arc::new(MokaCache::for_page_content()),
            FetchSettings {
                batch_timeout: Duration::from_millis(500),
                ..Default::default()
            },
        );
        let links = vec![link(&server, "/fast"), link(&server, "/slow")];

        let texts = orchestrator
            .fetch_all(&links, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(texts, vec!["Fast page that arrives before the deadline"]);
    }
}
