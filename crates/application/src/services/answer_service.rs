//! Answer service - streams a generated answer and persists it
//!
//! Opens the generation stream, reconciles it into incremental
//! [`StreamEvent`]s for the caller and, once the answer completed, hands the
//! full message to the message store in a background task. Background tasks
//! are tracked so a short-lived caller can wait for them before exiting.

use std::{fmt::Write as _, sync::Arc, time::Instant};

use domain::{ChatMessage, ConversationId, MessageMetadata, StreamEvent};
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, instrument, warn};

use super::{
    search_aggregator::SearchAggregator,
    stream_reconciler::{ReconcileOutcome, reconcile_stream},
};
use crate::{
    error::ApplicationError,
    ports::{GenerationPort, GenerationRequest, MessageStorePort},
};

/// Capacity of the per-answer event channel
const EVENT_BUFFER: usize = 64;

/// Upper bound on characters taken from one snippet into the prompt
const MAX_SNIPPET_CHARS: usize = 1_500;

const BASE_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer concisely and accurately.";

/// Streams answers from the generation capability
pub struct AnswerService {
    generation: Arc<dyn GenerationPort>,
    store: Arc<dyn MessageStorePort>,
    search: Option<Arc<SearchAggregator>>,
    tasks: TaskTracker,
}

impl std::fmt::Debug for AnswerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerService")
            .field("model", &self.generation.model_name())
            .field("has_search", &self.search.is_some())
            .field("background_tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl AnswerService {
    pub fn new(generation: Arc<dyn GenerationPort>, store: Arc<dyn MessageStorePort>) -> Self {
        Self {
            generation,
            store,
            search: None,
            tasks: TaskTracker::new(),
        }
    }

    /// Enable web context for [`Self::answer_with_search`]
    #[must_use]
    pub fn with_search(mut self, search: Arc<SearchAggregator>) -> Self {
        self.search = Some(search);
        self
    }

    /// Open a generation stream and return the live event channel
    ///
    /// Errors opening the stream are returned directly; no event is sent in
    /// that case. Once open, the channel carries deltas followed by exactly
    /// one `Done` or `Error`.
    #[instrument(skip(self, request, cancel), fields(conversation = %conversation_id))]
    pub async fn stream_answer(
        &self,
        conversation_id: ConversationId,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<StreamEvent>, ApplicationError> {
        let started = Instant::now();
        let stream = self.generation.open_stream(&request, &cancel).await?;
        debug!("Generation stream opened");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let store = Arc::clone(&self.store);
        let default_model = request.model.unwrap_or_else(|| self.generation.model_name());

        let tasks = self.tasks.clone();
        self.tasks.spawn(async move {
            match reconcile_stream(stream, &tx, &cancel).await {
                ReconcileOutcome::Completed {
                    message,
                    chunks,
                    model,
                } => {
                    let latency_ms =
                        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let message = ChatMessage::assistant(message).with_metadata(MessageMetadata {
                        model: Some(model.unwrap_or(default_model)),
                        chunks: u32::try_from(chunks).ok(),
                        latency_ms: Some(latency_ms),
                    });
                    spawn_persist(&tasks, store, conversation_id, message, cancel);
                },
                ReconcileOutcome::Failed { error, partial } => {
                    info!(
                        error = %error,
                        partial_len = partial.len(),
                        "Answer not persisted"
                    );
                },
            }
        });

        Ok(rx)
    }

    /// Answer `prompt`, grounding it on web snippets when search is enabled
    ///
    /// A failed search does not fail the answer; it proceeds without
    /// external context.
    pub async fn answer_with_search(
        &self,
        conversation_id: ConversationId,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<StreamEvent>, ApplicationError> {
        let snippets = match &self.search {
            Some(search) => search.search_or_empty(prompt, &cancel).await,
            None => Vec::new(),
        };
        debug!(snippets = snippets.len(), "Building prompt");
        let request = GenerationRequest::with_system(build_system_prompt(&snippets), prompt);
        self.stream_answer(conversation_id, request, cancel).await
    }

    /// Wait until every answer started so far has finished persisting
    ///
    /// The service still accepts new answers afterwards.
    pub async fn wait_for_persistence(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

/// Persist a finished answer without blocking the caller
///
/// The write is abandoned if the request is cancelled first.
fn spawn_persist(
    tasks: &TaskTracker,
    store: Arc<dyn MessageStorePort>,
    conversation_id: ConversationId,
    message: ChatMessage,
    cancel: CancellationToken,
) {
    tasks.spawn(async move {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(
                    conversation = %conversation_id,
                    "Request cancelled before answer was persisted"
                );
            },
            result = store.append(&conversation_id, &message) => {
                if let Err(e) = result {
                    warn!(conversation = %conversation_id, error = %e, "Failed to persist answer");
                }
            },
        }
    });
}

/// System prompt with numbered web snippets appended
fn build_system_prompt(snippets: &[String]) -> String {
    if snippets.is_empty() {
        return BASE_SYSTEM_PROMPT.to_string();
    }
    let mut prompt = String::from(BASE_SYSTEM_PROMPT);
    prompt.push_str("\n\nUse the following web sources where relevant:\n");
    for (i, snippet) in snippets.iter().enumerate() {
        let excerpt: String = snippet.chars().take(MAX_SNIPPET_CHARS).collect();
        let _ = write!(prompt, "\n[{}] {}\n", i + 1, excerpt.trim());
    }
    prompt
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::stream;
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    use super::*;
    use crate::ports::{GenerationChunk, GenerationStream, MockGenerationPort, MockMessageStorePort};

    /// Message store recording appends and signalling each one
    #[derive(Default)]
    struct RecordingStore {
        messages: Mutex<Vec<(ConversationId, ChatMessage)>>,
        appended: Notify,
    }

    #[async_trait::async_trait]
    impl MessageStorePort for RecordingStore {
        async fn append(
            &self,
            conversation_id: &ConversationId,
            message: &ChatMessage,
        ) -> Result<(), ApplicationError> {
            self.messages.lock().push((*conversation_id, message.clone()));
            self.appended.notify_one();
            Ok(())
        }
    }

    fn scripted(chunks: Vec<Result<&'static str, ApplicationError>>) -> MockGenerationPort {
        let mut mock = MockGenerationPort::new();
        mock.expect_open_stream().times(1).returning(move |_, _| {
            let items: Vec<_> = chunks
                .clone()
                .into_iter()
                .map(|c| c.map(GenerationChunk::text))
                .collect();
            Ok(Box::pin(stream::iter(items)) as GenerationStream)
        });
        mock.expect_model_name()
            .returning(|| "qwen2.5:1.5b".to_string());
        mock
    }

    async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn completed_answer_is_streamed_and_persisted_once() {
        let store = Arc::new(RecordingStore::default());
        let service = AnswerService::new(
            Arc::new(scripted(vec![Ok("Hi"), Ok("Hi there"), Ok(" friend")])),
            Arc::clone(&store) as Arc<dyn MessageStorePort>,
        );
        let conversation = ConversationId::new();

        let rx = service
            .stream_answer(
                conversation,
                GenerationRequest::simple("greet me"),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        let events = collect(rx).await;

        assert_eq!(events.last(), Some(&StreamEvent::Done));
        tokio::time::timeout(Duration::from_secs(1), store.appended.notified())
            .await
            .unwrap();
        let messages = store.messages.lock();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, conversation);
        assert_eq!(messages[0].1.content, "Hi there friend");
        let metadata = messages[0].1.metadata.clone().unwrap();
        assert_eq!(metadata.model.as_deref(), Some("qwen2.5:1.5b"));
        assert_eq!(metadata.chunks, Some(3));
    }

    #[tokio::test]
    async fn waiting_for_persistence_sees_the_stored_answer() {
        let store = Arc::new(RecordingStore::default());
        let service = AnswerService::new(
            Arc::new(scripted(vec![Ok("The "), Ok("answer")])),
            Arc::clone(&store) as Arc<dyn MessageStorePort>,
        );

        let rx = service
            .stream_answer(
                ConversationId::new(),
                GenerationRequest::simple("q"),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(collect(rx).await.last(), Some(&StreamEvent::Done));
        service.wait_for_persistence().await;

        let messages = store.messages.lock();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1.content, "The answer");
    }

    #[tokio::test]
    async fn wait_for_persistence_returns_when_idle() {
        let mut store = MockMessageStorePort::new();
        store.expect_append().never();
        let service = AnswerService::new(Arc::new(MockGenerationPort::new()), Arc::new(store));

        service.wait_for_persistence().await;
        service.wait_for_persistence().await;
    }

    #[tokio::test]
    async fn failed_answer_is_never_persisted() {
        let mut store = MockMessageStorePort::new();
        store.expect_append().never();
        let service = AnswerService::new(
            Arc::new(scripted(vec![
                Ok("Half an ans"),
                Err(ApplicationError::GenerationStream("model crashed".into())),
            ])),
            Arc::new(store),
        );

        let rx = service
            .stream_answer(
                ConversationId::new(),
                GenerationRequest::simple("q"),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        let events = collect(rx).await;

        assert_eq!(events[0], StreamEvent::delta("Half an ans"));
        assert!(matches!(events.last(), Some(StreamEvent::Error { .. })));
    }

    #[tokio::test]
    async fn open_failure_is_returned_without_events() {
        let mut generation = MockGenerationPort::new();
        generation.expect_open_stream().returning(|_, _| {
            Err(ApplicationError::GenerationOpenFailed {
                attempts: 3,
                reason: "connection refused".into(),
            })
        });
        let mut store = MockMessageStorePort::new();
        store.expect_append().never();
        let service = AnswerService::new(Arc::new(generation), Arc::new(store));

        let result = service
            .stream_answer(
                ConversationId::new(),
                GenerationRequest::simple("q"),
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(
            result,
            Err(ApplicationError::GenerationOpenFailed { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn answer_without_search_uses_base_prompt() {
        let mut generation = MockGenerationPort::new();
        generation
            .expect_open_stream()
            .withf(|request, _| request.system_prompt() == Some(BASE_SYSTEM_PROMPT))
            .times(1)
            .returning(|_, _| Ok(Box::pin(stream::empty()) as GenerationStream));
        generation
            .expect_model_name()
            .returning(|| "qwen2.5:1.5b".to_string());
        let service = AnswerService::new(
            Arc::new(generation),
            Arc::new(RecordingStore::default()),
        );

        let rx = service
            .answer_with_search(ConversationId::new(), "hello", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(collect(rx).await, vec![StreamEvent::Done]);
    }

    #[test]
    fn system_prompt_numbers_snippets() {
        let prompt = build_system_prompt(&["first source".to_string(), "second".to_string()]);
        assert!(prompt.starts_with(BASE_SYSTEM_PROMPT));
        assert!(prompt.contains("[1] first source"));
        assert!(prompt.contains("[2] second"));
    }

    #[test]
    fn system_prompt_truncates_long_snippets() {
        let prompt = build_system_prompt(&["x".repeat(10_000)]);
        assert!(prompt.len() < BASE_SYSTEM_PROMPT.len() + MAX_SNIPPET_CHARS + 100);
    }
}
