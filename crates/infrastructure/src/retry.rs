//! Retry with capped exponential backoff
//!
//! Every attempt and every backoff sleep races a [`CancellationToken`]; a
//! cancelled token ends the loop at once and is never retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use infrastructure::retry::{RetryConfig, with_retry};
//!
//! let outcome = with_retry(&RetryConfig::generation(), &cancel, || async {
//!     backend.open().await
//! })
//! .await;
//! ```

use std::{future::Future, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for retry behavior with exponential backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Retries after the first attempt; total attempts = `max_retries + 1`
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub jitter_enabled: bool,

    /// Maximum jitter factor (0.0 to 1.0)
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

const fn default_initial_delay() -> u64 {
    1_000
}

const fn default_max_delay() -> u64 {
    5_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_jitter_factor() -> f64 {
    0.1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::generation()
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn new(
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
        max_retries: u32,
    ) -> Self {
        Self {
            initial_delay_ms,
            max_delay_ms,
            multiplier,
            max_retries,
            jitter_enabled: false,
            jitter_factor: default_jitter_factor(),
        }
    }

    /// Opening a generation stream: 3 attempts, waiting 1s then 2s (cap 5s)
    #[must_use]
    pub const fn generation() -> Self {
        Self::new(
            default_initial_delay(),
            default_max_delay(),
            default_multiplier(),
            default_max_retries(),
        )
    }

    #[must_use]
    pub const fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_enabled = true;
        self.jitter_factor = factor;
        self
    }

    /// Total attempts including the first one
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after the failed attempt `attempt` (0-indexed)
    ///
    /// `min(initial * multiplier^attempt, max)`, then jittered when enabled.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = (self.initial_delay_ms as f64) * self.multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay_ms as f64);

        let final_delay = if self.jitter_enabled && self.jitter_factor > 0.0 {
            let jitter_range = capped_delay * self.jitter_factor;
            let jitter = rand::rng().random_range(-jitter_range..=jitter_range);
            (capped_delay + jitter).max(0.0)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.multiplier < 1.0 {
            return Err("retry.multiplier must be at least 1.0".to_string());
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err("retry.max_delay_ms must not be below retry.initial_delay_ms".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err("retry.jitter_factor must be within 0.0..=1.0".to_string());
        }
        Ok(())
    }
}

/// Errors that know whether another attempt may help
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Every failure except cancellation earns another attempt
impl Retryable for application::ApplicationError {
    fn is_retryable(&self) -> bool {
        !self.is_cancelled()
    }
}

/// Why a retried operation gave up
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The token fired before or during an attempt or a backoff wait
    #[error("retry cancelled")]
    Cancelled,

    /// Every attempt failed with a retryable error
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    /// An attempt failed with an error that retrying cannot fix
    #[error("{0}")]
    Permanent(E),
}

/// Outcome of [`with_retry`] with attempt bookkeeping
#[derive(Debug)]
pub struct RetryResult<T, E> {
    pub result: Result<T, RetryError<E>>,
    /// Attempts actually started (0 when cancelled up front)
    pub attempts: u32,
    /// Total time spent including backoff
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, RetryError<E>> {
        self.result
    }
}

/// Run `operation` until it succeeds, fails permanently, runs out of
/// attempts or `cancel` fires
#[allow(clippy::cast_possible_truncation)]
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    let finish = |result, attempts| RetryResult {
        result,
        attempts,
        total_duration: start.elapsed(),
    };

    loop {
        if cancel.is_cancelled() {
            debug!(attempts, "Retry loop cancelled");
            return finish(Err(RetryError::Cancelled), attempts);
        }

        attempts += 1;
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return finish(Err(RetryError::Cancelled), attempts),
            result = operation() => result,
        };

        let err = match result {
            Ok(value) => {
                if attempts > 1 {
                    debug!(
                        attempts,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Operation succeeded after retries"
                    );
                }
                return finish(Ok(value), attempts);
            },
            Err(err) => err,
        };

        if !err.is_retryable() {
            debug!(attempts, error = %err, "Operation failed with non-retryable error");
            return finish(Err(RetryError::Permanent(err)), attempts);
        }

        if attempts >= config.max_attempts() {
            warn!(attempts, error = %err, "Operation failed after max retries");
            return finish(
                Err(RetryError::Exhausted {
                    attempts,
                    last_error: err,
                }),
                attempts,
            );
        }

        let delay = config.delay_for_attempt(attempts - 1);
        warn!(
            attempt = attempts,
            max_retries = config.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Operation failed, retrying"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => return finish(Err(RetryError::Cancelled), attempts),
            () = tokio::time::sleep(delay) => {},
        }
    }
}
