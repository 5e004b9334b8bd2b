//! ConversationRepository trait definition.
//!
//! Provides the durable store for conversations and their messages.
//! Follows the RPITIT pattern used by every port in this crate.

use concierge_types::conversation::{Conversation, Message};
use concierge_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for conversation persistence.
///
/// Implementations live in concierge-infra (e.g., `SqliteConversationRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). Dropping a
/// returned future abandons the call.
pub trait ConversationRepository: Send + Sync {
    /// Insert a new conversation together with its messages.
    fn create(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Write back title, `updated_at` and any messages not yet stored.
    ///
    /// Returns `NotFound` if the conversation does not exist.
    fn update(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Durably append one message to an existing conversation.
    fn append_message(
        &self,
        conversation_id: &Uuid,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Load a conversation with all of its messages in creation order.
    fn describe(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// List conversations, most recently updated first, without messages.
    fn list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;
}
