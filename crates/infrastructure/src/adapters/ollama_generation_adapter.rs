//! Ollama generation adapter - Implements GenerationPort using ai_core
//!
//! Works with any Ollama-compatible backend. The stream ends after the
//! server's `done` line even if the connection stays open.

use std::sync::Arc;

use ai_core::{
    InferenceConfig, InferenceEngine, InferenceError, InferenceMessage, InferenceRequest,
    OllamaInferenceEngine,
};
use application::{
    error::ApplicationError,
    ports::{GenerationChunk, GenerationPort, GenerationRequest, GenerationStream},
};
use async_trait::async_trait;
use futures::{StreamExt, future};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

pub struct OllamaGenerationAdapter {
    engine: Arc<dyn InferenceEngine>,
}

impl std::fmt::Debug for OllamaGenerationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaGenerationAdapter")
            .field("model", &self.engine.default_model())
            .finish()
    }
}

impl OllamaGenerationAdapter {
    pub fn new(config: InferenceConfig) -> Result<Self, ApplicationError> {
        let engine = OllamaInferenceEngine::new(config)
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self::with_engine(Arc::new(engine)))
    }

    pub fn with_engine(engine: Arc<dyn InferenceEngine>) -> Self {
        Self { engine }
    }

    fn to_inference_request(request: &GenerationRequest) -> InferenceRequest {
        InferenceRequest {
            messages: request.messages.iter().map(InferenceMessage::from).collect(),
            model: request.model.clone(),
            max_tokens: None,
            temperature: request.temperature,
        }
    }

    /// Map a failure to open the stream
    fn map_open_error(e: InferenceError) -> ApplicationError {
        match e {
            InferenceError::RateLimited => ApplicationError::RateLimited,
            InferenceError::ModelNotAvailable(model) => {
                ApplicationError::Configuration(format!("model not available: {model}"))
            },
            e if e.is_retryable() => ApplicationError::Inference(e.to_string()),
            e => ApplicationError::Internal(e.to_string()),
        }
    }
}

#[async_trait]
impl GenerationPort for OllamaGenerationAdapter {
    #[instrument(skip(self, request, cancel), fields(messages = request.messages.len()))]
    async fn open_stream(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationStream, ApplicationError> {
        if cancel.is_cancelled() {
            return Err(ApplicationError::Cancelled);
        }
        let inference_request = Self::to_inference_request(request);

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApplicationError::Cancelled),
            opened = self.engine.generate_stream(inference_request) => opened,
        };
        let stream = opened.map_err(Self::map_open_error)?;
        debug!("Generation stream open");

        let chunks = stream.scan(false, |finished, item| {
            if *finished {
                return future::ready(None);
            }
            let mapped = match item {
                Ok(chunk) => {
                    *finished = chunk.done;
                    Ok(GenerationChunk {
                        content: chunk.content,
                        model: chunk.model,
                    })
                },
                Err(e) => {
                    *finished = true;
                    Err(ApplicationError::GenerationStream(e.to_string()))
                },
            };
            future::ready(Some(mapped))
        });

        Ok(Box::pin(chunks))
    }

    fn model_name(&self) -> String {
        self.engine.default_model().to_string()
    }
}
