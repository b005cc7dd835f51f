//! Stream reconciliation
//!
//! Model backends disagree on whether streamed chunks are deltas or
//! cumulative snapshots, and some switch mid-stream. The reconciler turns
//! either into an exactly-once sequence of increments while keeping the
//! full message for persistence.
//!
//! A chunk is read as a cumulative snapshot when it is strictly longer than
//! the text emitted so far, that text is non-empty, and the chunk starts
//! with it. Anything else is a delta. A genuine delta that happens to repeat
//! everything emitted so far is therefore read as a snapshot.

use domain::StreamEvent;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{error::ApplicationError, ports::GenerationStream};

/// Lifecycle of a reconciled stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcilerState {
    /// No chunk received yet
    #[default]
    Idle,
    /// Receiving chunks
    Streaming,
    /// Upstream ended normally
    Completed,
    /// Upstream failed or was cancelled
    Failed,
}

/// Per-answer reconciliation state
#[derive(Debug, Default)]
pub struct StreamReconciler {
    state: ReconcilerState,
    emitted: String,
    increments: Vec<String>,
}

impl StreamReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn state(&self) -> ReconcilerState {
        self.state
    }

    /// Text delivered downstream so far
    pub fn emitted(&self) -> &str {
        &self.emitted
    }

    /// Number of non-empty increments produced so far
    pub fn increments(&self) -> usize {
        self.increments.len()
    }

    /// Feed one upstream chunk, returning the increment to emit
    ///
    /// Returns `None` for empty chunks and for chunks arriving after the
    /// stream reached a terminal state.
    pub fn accept(&mut self, chunk: &str) -> Option<String> {
        match self.state {
            ReconcilerState::Completed | ReconcilerState::Failed => return None,
            ReconcilerState::Idle => self.state = ReconcilerState::Streaming,
            ReconcilerState::Streaming => {},
        }
        if chunk.is_empty() {
            return None;
        }

        let increment = match chunk.strip_prefix(self.emitted.as_str()) {
            Some(rest) if !self.emitted.is_empty() && !rest.is_empty() => rest,
            _ => chunk,
        };
        let increment = increment.to_string();
        self.emitted.push_str(&increment);
        self.increments.push(increment.clone());
        Some(increment)
    }

    /// Finish successfully, returning the full message
    pub fn complete(&mut self) -> String {
        self.state = ReconcilerState::Completed;
        self.increments.concat()
    }

    /// Finish with a failure, returning the partial text already emitted
    pub fn fail(&mut self) -> String {
        self.state = ReconcilerState::Failed;
        std::mem::take(&mut self.emitted)
    }
}

/// How a reconciled stream ended
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// Upstream ended; `message` is the full answer
    Completed {
        message: String,
        chunks: usize,
        model: Option<String>,
    },
    /// Upstream failed, was cancelled, or the receiver went away
    Failed {
        error: ApplicationError,
        partial: String,
    },
}

/// Drive `stream` to its end, forwarding increments to `events`
///
/// Always sends exactly one terminal event (`Done` or `Error`) when the
/// receiver is still listening. Chunks are processed strictly in order.
pub async fn reconcile_stream(
    mut stream: GenerationStream,
    events: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
) -> ReconcileOutcome {
    let mut reconciler = StreamReconciler::new();
    let mut model = None;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => Some(Err(ApplicationError::Cancelled)),
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                if chunk.model.is_some() {
                    model = chunk.model;
                }
                let Some(increment) = reconciler.accept(&chunk.content) else {
                    continue;
                };
                if events.send(StreamEvent::delta(increment)).await.is_err() {
                    debug!("Answer receiver dropped, abandoning stream");
                    return ReconcileOutcome::Failed {
                        error: ApplicationError::Cancelled,
                        partial: reconciler.fail(),
                    };
                }
            },
            Some(Err(e)) => {
                let error = match e {
                    ApplicationError::Cancelled => ApplicationError::Cancelled,
                    ApplicationError::GenerationStream(reason) => {
                        ApplicationError::GenerationStream(reason)
                    },
                    other => ApplicationError::GenerationStream(other.to_string()),
                };
                let partial = reconciler.fail();
                warn!(error = %error, partial_len = partial.len(), "Generation stream failed");
                let _ = events.send(StreamEvent::error(error.to_string())).await;
                return ReconcileOutcome::Failed { error, partial };
            },
            None => {
                let chunks = reconciler.increments();
                let message = reconciler.complete();
                debug!(chunks, message_len = message.len(), "Generation stream completed");
                let _ = events.send(StreamEvent::Done).await;
                return ReconcileOutcome::Completed {
                    message,
                    chunks,
                    model,
                };
            },
        }
    }
}
