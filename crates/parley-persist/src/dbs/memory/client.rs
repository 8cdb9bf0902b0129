use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{PersistError, Result};
use crate::models::{Chat, ChatList, ChatPage, DBMessage, Document, MessageRole, Suggestion, Visibility, Vote};
use crate::trait_client::PersistenceClient;

#[derive(Default)]
struct Tables {
    chats: HashMap<Uuid, Chat>,
    messages: Vec<DBMessage>,
    votes: HashMap<(Uuid, Uuid), Vote>,
    documents: Vec<Document>,
    suggestions: Vec<Suggestion>,
}

/// Process-local store used for development and tests
///
/// Applies the same cascade rules as the Postgres schema.
#[derive(Default)]
pub struct MemoryPersistenceClient {
    tables: RwLock<Tables>,
}

impl MemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceClient for MemoryPersistenceClient {
    async fn save_chat(&self, chat: Chat) -> Result<Chat> {
        let mut tables = self.tables.write().await;
        tables.chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn get_chat(&self, chat_id: Uuid) -> Result<Option<Chat>> {
        Ok(self.tables.read().await.chats.get(&chat_id).cloned())
    }

    async fn list_chats(&self, user_id: &str, page: ChatPage) -> Result<ChatList> {
        let tables = self.tables.read().await;
        let limit = page.limit.clamp(1, ChatPage::MAX_LIMIT);

        let mut chats: Vec<Chat> = tables
            .chats
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let cursor_time = |id: Uuid| -> Result<DateTime<Utc>> {
            tables
                .chats
                .get(&id)
                .map(|c| c.created_at)
                .ok_or_else(|| PersistError::ChatNotFound(id.to_string()))
        };

        let (chats, has_more) = if let Some(id) = page.starting_after {
            let at = cursor_time(id)?;
            let older: Vec<Chat> = chats.into_iter().filter(|c| c.created_at < at).collect();
            let has_more = older.len() > limit;
            (older.into_iter().take(limit).collect(), has_more)
        } else if let Some(id) = page.ending_before {
            let at = cursor_time(id)?;
            let newer: Vec<Chat> = chats.into_iter().filter(|c| c.created_at > at).collect();
            let has_more = newer.len() > limit;
            // keep the page adjacent to the cursor
            let skip = newer.len().saturating_sub(limit);
            (newer.into_iter().skip(skip).collect(), has_more)
        } else {
            let has_more = chats.len() > limit;
            (chats.into_iter().take(limit).collect(), has_more)
        };

        Ok(ChatList { chats, has_more })
    }

    async fn delete_chat(&self, chat_id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.chats.remove(&chat_id).is_none() {
            return Err(PersistError::ChatNotFound(chat_id.to_string()));
        }
        tables.votes.retain(|(chat, _), _| *chat != chat_id);
        tables.messages.retain(|m| m.chat_id != chat_id);
        Ok(())
    }

    async fn update_chat_visibility(&self, chat_id: Uuid, visibility: Visibility) -> Result<()> {
        let mut tables = self.tables.write().await;
        let chat = tables
            .chats
            .get_mut(&chat_id)
            .ok_or_else(|| PersistError::ChatNotFound(chat_id.to_string()))?;
        chat.visibility = visibility;
        chat.updated_at = Utc::now();
        Ok(())
    }

    async fn save_message(&self, message: DBMessage) -> Result<()> {
        let mut tables = self.tables.write().await;
        let chat = tables
            .chats
            .get_mut(&message.chat_id)
            .ok_or_else(|| PersistError::ChatNotFound(message.chat_id.to_string()))?;
        chat.updated_at = Utc::now();
        tables.messages.push(message);
        Ok(())
    }

    async fn get_message(&self, message_id: Uuid) -> Result<Option<DBMessage>> {
        let tables = self.tables.read().await;
        Ok(tables.messages.iter().find(|m| m.id == message_id).cloned())
    }

    async fn get_messages(
        &self,
        chat_id: Uuid,
        limit: Option<usize>,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<DBMessage>> {
        let tables = self.tables.read().await;
        let mut messages: Vec<DBMessage> = tables
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .filter(|m| before.map_or(true, |b| m.created_at < b))
            .cloned()
            .collect();
        // stable sort keeps insertion order for equal timestamps
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        if let Some(limit) = limit {
            let skip = messages.len().saturating_sub(limit);
            messages.drain(..skip);
        }
        Ok(messages)
    }

    async fn delete_messages_after(&self, chat_id: Uuid, after: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let doomed: Vec<Uuid> = tables
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id && m.created_at >= after)
            .map(|m| m.id)
            .collect();

        tables
            .votes
            .retain(|(chat, message), _| !(*chat == chat_id && doomed.contains(message)));
        tables.messages.retain(|m| !doomed.contains(&m.id));
        Ok(doomed.len() as u64)
    }

    async fn count_user_messages_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u64> {
        let tables = self.tables.read().await;
        let count = tables
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::User && m.user_id == user_id && m.created_at >= since)
            .count();
        Ok(count as u64)
    }

    async fn vote_message(&self, vote: Vote) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.chats.contains_key(&vote.chat_id) {
            return Err(PersistError::ChatNotFound(vote.chat_id.to_string()));
        }
        tables.votes.insert((vote.chat_id, vote.message_id), vote);
        Ok(())
    }

    async fn get_votes(&self, chat_id: Uuid) -> Result<Vec<Vote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .values()
            .filter(|v| v.chat_id == chat_id)
            .cloned()
            .collect())
    }

    async fn save_document(&self, document: Document) -> Result<Document> {
        let mut tables = self.tables.write().await;
        tables.documents.push(document.clone());
        Ok(document)
    }

    async fn get_documents(&self, document_id: Uuid) -> Result<Vec<Document>> {
        let tables = self.tables.read().await;
        let mut versions: Vec<Document> = tables
            .documents
            .iter()
            .filter(|d| d.id == document_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(versions)
    }

    async fn get_latest_document(&self, document_id: Uuid) -> Result<Option<Document>> {
        Ok(self.get_documents(document_id).await?.pop())
    }

    async fn delete_documents_after(
        &self,
        document_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<Document>> {
        let mut tables = self.tables.write().await;

        tables
            .suggestions
            .retain(|s| !(s.document_id == document_id && s.document_created_at > timestamp));

        let (removed, kept): (Vec<Document>, Vec<Document>) = std::mem::take(&mut tables.documents)
            .into_iter()
            .partition(|d| d.id == document_id && d.created_at > timestamp);
        tables.documents = kept;
        Ok(removed)
    }

    async fn save_suggestions(&self, suggestions: Vec<Suggestion>) -> Result<()> {
        let mut tables = self.tables.write().await;
        for suggestion in &suggestions {
            let exists = tables
                .documents
                .iter()
                .any(|d| d.id == suggestion.document_id && d.created_at == suggestion.document_created_at);
            if !exists {
                return Err(PersistError::DocumentNotFound(suggestion.document_id.to_string()));
            }
        }
        tables.suggestions.extend(suggestions);
        Ok(())
    }

    async fn get_suggestions(&self, document_id: Uuid) -> Result<Vec<Suggestion>> {
        let tables = self.tables.read().await;
        Ok(tables
            .suggestions
            .iter()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect())
    }
}
