//! Persistence collaborator for finalized answers

use async_trait::async_trait;
use domain::{ChatMessage, ConversationId};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port receiving one finalized message per completed generation
///
/// Never called for a failed or cancelled generation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageStorePort: Send + Sync {
    /// Append a message to a conversation
    async fn append(
        &self,
        conversation_id: &ConversationId,
        message: &ChatMessage,
    ) -> Result<(), ApplicationError>;
}
