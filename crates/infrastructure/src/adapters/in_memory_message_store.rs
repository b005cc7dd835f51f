//! In-process message store
//!
//! Keeps finalized answers per conversation for the lifetime of the
//! process. Used by the CLI, which has no durable storage.

use std::collections::HashMap;

use application::{error::ApplicationError, ports::MessageStorePort};
use async_trait::async_trait;
use domain::{ChatMessage, ConversationId};
use parking_lot::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    conversations: RwLock<HashMap<ConversationId, Vec<ChatMessage>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages stored for a conversation, oldest first
    pub fn messages(&self, conversation_id: &ConversationId) -> Vec<ChatMessage> {
        self.conversations
            .read()
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of stored messages across conversations
    pub fn len(&self) -> usize {
        self.conversations.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageStorePort for InMemoryMessageStore {
    async fn append(
        &self,
        conversation_id: &ConversationId,
        message: &ChatMessage,
    ) -> Result<(), ApplicationError> {
        let mut conversations = self.conversations.write();
        let messages = conversations.entry(*conversation_id).or_default();
        messages.push(message.clone());
        debug!(
            conversation = %conversation_id,
            messages = messages.len(),
            "Message appended"
        );
        Ok(())
    }
}
