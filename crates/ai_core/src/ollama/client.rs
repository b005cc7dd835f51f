//! Ollama chat client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::streaming::create_stream;
use crate::{
    config::InferenceConfig,
    error::InferenceError,
    ports::{InferenceEngine, InferenceMessage, InferenceRequest, StreamingResponse},
};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Streaming generation against an Ollama-compatible server
#[derive(Debug)]
pub struct OllamaInferenceEngine {
    client: Client,
    config: InferenceConfig,
}

impl OllamaInferenceEngine {
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| InferenceError::ConnectionFailed(e.to_string()))?;

        info!(
            base_url = %config.base_url,
            model = %config.default_model,
            "Initialized Ollama inference engine"
        );

        Ok(Self { client, config })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn resolve_model<'a>(&'a self, request: &'a InferenceRequest) -> &'a str {
        request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model)
    }

    fn chat_body<'a>(&'a self, request: &'a InferenceRequest) -> ChatBody<'a> {
        ChatBody {
            model: self.resolve_model(request),
            messages: &request.messages,
            stream: true,
            options: ChatOptions {
                temperature: request.temperature.unwrap_or(self.config.temperature),
                num_predict: request.max_tokens.unwrap_or(self.config.max_tokens),
                top_p: self.config.top_p,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [InferenceMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
    top_p: f32,
}

/// Map a rejected request to an error, keeping the body for context
fn status_error(status: StatusCode, body: String, model: &str) -> InferenceError {
    match status {
        StatusCode::NOT_FOUND => InferenceError::ModelNotAvailable(model.to_string()),
        StatusCode::TOO_MANY_REQUESTS => InferenceError::RateLimited,
        s if s.is_server_error() => InferenceError::ServerError(format!("Status {s}: {body}")),
        s => InferenceError::RequestFailed(format!("Status {s}: {body}")),
    }
}

#[async_trait]
impl InferenceEngine for OllamaInferenceEngine {
    #[instrument(
        skip(self, request),
        fields(model = %self.resolve_model(&request), messages = request.messages.len())
    )]
    async fn generate_stream(
        &self,
        request: InferenceRequest,
    ) -> Result<StreamingResponse, InferenceError> {
        let body = self.chat_body(&request);
        debug!("Opening chat stream");

        let response = self
            .client
            .post(self.api_url("chat"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "Chat stream rejected");
            return Err(status_error(status, text, body.model));
        }

        Ok(create_stream(response))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<bool, InferenceError> {
        let response = self
            .client
            .get(self.api_url("tags"))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) if e.is_timeout() || e.is_connect() => Ok(false),
            Err(e) => Err(InferenceError::RequestFailed(e.to_string())),
        }
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }
}
