use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Chat, ChatList, ChatPage, DBMessage, Document, Suggestion, Visibility, Vote};

/// Database persistence operations
///
/// Implementations provide backend-specific storage. All listing operations
/// return rows in ascending `created_at` order unless stated otherwise.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    // Chats

    async fn save_chat(&self, chat: Chat) -> Result<Chat>;

    async fn get_chat(&self, chat_id: Uuid) -> Result<Option<Chat>>;

    /// A user's chats, newest first
    async fn list_chats(&self, user_id: &str, page: ChatPage) -> Result<ChatList>;

    /// Delete a chat together with its votes and messages
    async fn delete_chat(&self, chat_id: Uuid) -> Result<()>;

    async fn update_chat_visibility(&self, chat_id: Uuid, visibility: Visibility) -> Result<()>;

    // Messages

    async fn save_message(&self, message: DBMessage) -> Result<()>;

    async fn get_message(&self, message_id: Uuid) -> Result<Option<DBMessage>>;

    /// Messages of a chat, optionally only those created before `before`,
    /// keeping the most recent `limit`
    async fn get_messages(
        &self,
        chat_id: Uuid,
        limit: Option<usize>,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<DBMessage>>;

    /// Delete messages created at or after `after`, and their votes.
    /// Returns the number of messages removed.
    async fn delete_messages_after(&self, chat_id: Uuid, after: DateTime<Utc>) -> Result<u64>;

    /// User-authored messages since `since`, across all chats
    async fn count_user_messages_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u64>;

    // Votes

    async fn vote_message(&self, vote: Vote) -> Result<()>;

    async fn get_votes(&self, chat_id: Uuid) -> Result<Vec<Vote>>;

    // Documents

    /// Append a document version
    async fn save_document(&self, document: Document) -> Result<Document>;

    /// All versions of a document
    async fn get_documents(&self, document_id: Uuid) -> Result<Vec<Document>>;

    async fn get_latest_document(&self, document_id: Uuid) -> Result<Option<Document>>;

    /// Drop versions created after `timestamp` and suggestions attached to
    /// them. Returns the removed versions.
    async fn delete_documents_after(
        &self,
        document_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<Document>>;

    // Suggestions

    async fn save_suggestions(&self, suggestions: Vec<Suggestion>) -> Result<()>;

    async fn get_suggestions(&self, document_id: Uuid) -> Result<Vec<Suggestion>>;
}
