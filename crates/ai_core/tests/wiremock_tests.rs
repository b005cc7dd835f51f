//! Integration tests for the Ollama chat stream using WireMock

use ai_core::{InferenceConfig, InferenceEngine, InferenceError, InferenceRequest, OllamaInferenceEngine};
use futures::StreamExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

fn config_for_mock(base_url: &str) -> InferenceConfig {
    InferenceConfig {
        base_url: base_url.to_string(),
        default_model: "test-model".to_string(),
        timeout_ms: 5000,
        ..Default::default()
    }
}

fn ndjson(lines: &[serde_json::Value]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

fn content_line(content: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "test-model",
        "message": {"role": "assistant", "content": content},
        "done": false
    })
}

fn done_line() -> serde_json::Value {
    serde_json::json!({
        "model": "test-model",
        "message": {"role": "assistant", "content": ""},
        "done": true,
        "eval_count": 3
    })
}

#[tokio::test]
async fn streams_chunks_until_done() {
    let mock_server = MockServer::start().await;
    let body = ndjson(&[
        content_line("Hello"),
        content_line(" there"),
        done_line(),
    ]);

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({"stream": true, "model": "test-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = OllamaInferenceEngine::new(config_for_mock(&mock_server.uri())).unwrap();
    let stream = engine
        .generate_stream(InferenceRequest::simple("Hi"))
        .await
        .unwrap();
    let chunks: Vec<_> = stream.collect().await;

    let chunks: Vec<_> = chunks.into_iter().map(Result::unwrap).collect();
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].content, "Hello");
    assert_eq!(chunks[1].content, " there");
    assert!(chunks[2].done);
    assert_eq!(chunks[2].model.as_deref(), Some("test-model"));
}

#[tokio::test]
async fn request_model_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({"model": "llama3.2:1b"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(ndjson(&[done_line()]), "application/x-ndjson"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = OllamaInferenceEngine::new(config_for_mock(&mock_server.uri())).unwrap();
    let request = InferenceRequest::simple("Hi").with_model("llama3.2:1b");

    assert!(engine.generate_stream(request).await.is_ok());
}

#[tokio::test]
async fn unknown_model_fails_to_open() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"error": "model 'test-model' not found"})),
        )
        .mount(&mock_server)
        .await;

    let engine = OllamaInferenceEngine::new(config_for_mock(&mock_server.uri())).unwrap();
    let result = engine.generate_stream(InferenceRequest::simple("Hi")).await;

    assert!(matches!(result, Err(InferenceError::ModelNotAvailable(m)) if m == "test-model"));
}

#[tokio::test]
async fn server_error_is_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
        .mount(&mock_server)
        .await;

    let engine = OllamaInferenceEngine::new(config_for_mock(&mock_server.uri())).unwrap();
    let Err(error) = engine.generate_stream(InferenceRequest::simple("Hi")).await else {
        panic!("expected the stream to be rejected");
    };

    assert!(matches!(error, InferenceError::ServerError(_)));
    assert!(error.is_retryable());
}

#[tokio::test]
async fn mid_stream_error_line_surfaces_as_stream_error() {
    let mock_server = MockServer::start().await;
    let body = ndjson(&[
        content_line("Part"),
        serde_json::json!({"error": "out of memory"}),
    ]);

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&mock_server)
        .await;

    let engine = OllamaInferenceEngine::new(config_for_mock(&mock_server.uri())).unwrap();
    let chunks: Vec<_> = engine
        .generate_stream(InferenceRequest::simple("Hi"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(chunks[0].as_ref().unwrap().content, "Part");
    assert!(matches!(&chunks[1], Err(InferenceError::StreamError(m)) if m == "out of memory"));
}

#[tokio::test]
async fn health_check_reports_reachability() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
        .mount(&mock_server)
        .await;

    let engine = OllamaInferenceEngine::new(config_for_mock(&mock_server.uri())).unwrap();
    assert!(engine.health_check().await.unwrap());
}

#[tokio::test]
async fn health_check_is_false_when_unreachable() {
    // Nothing listens on port 9 on the loopback interface.
    let engine = OllamaInferenceEngine::new(config_for_mock("http://127.0.0.1:9")).unwrap();
    assert!(!engine.health_check().await.unwrap());
}
