//! Retry decorator for opening generation streams
//!
//! Only the opening call is retried, and every failure except cancellation
//! is retried up to the configured attempts. Once a stream is handed out,
//! failures arrive as stream items and end that answer.

use application::{
    error::ApplicationError,
    ports::{GenerationPort, GenerationRequest, GenerationStream},
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::retry::{RetryConfig, RetryError, with_retry};

#[derive(Debug)]
pub struct RetryingGenerationAdapter<G> {
    inner: G,
    config: RetryConfig,
}

impl<G: GenerationPort> RetryingGenerationAdapter<G> {
    pub const fn new(inner: G, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Decorate with [`RetryConfig::generation`]
    pub const fn with_defaults(inner: G) -> Self {
        Self::new(inner, RetryConfig::generation())
    }
}

#[async_trait]
impl<G: GenerationPort> GenerationPort for RetryingGenerationAdapter<G> {
    #[instrument(skip_all, fields(max_attempts = self.config.max_attempts()))]
    async fn open_stream(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationStream, ApplicationError> {
        let outcome = with_retry(&self.config, cancel, || {
            self.inner.open_stream(request, cancel)
        })
        .await;

        let attempts = outcome.attempts;
        match outcome.result {
            Ok(stream) => {
                if attempts > 1 {
                    info!(attempts, "Generation stream opened after retries");
                }
                Ok(stream)
            },
            Err(RetryError::Cancelled | RetryError::Permanent(ApplicationError::Cancelled)) => {
                Err(ApplicationError::Cancelled)
            },
            Err(RetryError::Exhausted { attempts, last_error }) => {
                Err(ApplicationError::GenerationOpenFailed {
                    attempts,
                    reason: last_error.to_string(),
                })
            },
            Err(RetryError::Permanent(error)) => Err(ApplicationError::GenerationOpenFailed {
                attempts,
                reason: error.to_string(),
            }),
        }
    }

    fn model_name(&self) -> String {
        self.inner.model_name()
    }
}
