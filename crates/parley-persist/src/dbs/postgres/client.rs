use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

use super::rows::{row_to_chat, row_to_document, row_to_message, row_to_suggestion, row_to_vote};
use crate::error::{PersistError, Result};
use crate::models::{Chat, ChatList, ChatPage, DBMessage, Document, Suggestion, Visibility, Vote};
use crate::trait_client::PersistenceClient;

const CHAT_COLUMNS: &str = "id, user_id, title, visibility, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, chat_id, user_id, role, message_type, content, tool_call_id, \
                               tool_name, arguments, created_at, duration_ms";
const DOCUMENT_COLUMNS: &str = "id, created_at, title, content, kind, user_id";
const SUGGESTION_COLUMNS: &str = "id, document_id, document_created_at, original_text, \
                                  suggested_text, description, is_resolved, user_id, created_at";

pub struct PostgresPersistenceClient {
    pool: PgPool,
}

impl PostgresPersistenceClient {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| PersistError::Connection(format!("PostgreSQL connection failed: {e}")))?;

        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Schema migration complete");
        Ok(())
    }

    async fn chat_created_at(&self, chat_id: Uuid) -> Result<DateTime<Utc>> {
        sqlx::query_scalar::<_, DateTime<Utc>>("SELECT created_at FROM chats WHERE id = $1")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PersistError::ChatNotFound(chat_id.to_string()))
    }
}

#[async_trait]
impl PersistenceClient for PostgresPersistenceClient {
    async fn save_chat(&self, chat: Chat) -> Result<Chat> {
        sqlx::query(
            "INSERT INTO chats (id, user_id, title, visibility, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title, \
             visibility = EXCLUDED.visibility, updated_at = EXCLUDED.updated_at",
        )
        .bind(chat.id)
        .bind(&chat.user_id)
        .bind(&chat.title)
        .bind(chat.visibility.as_str())
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(chat_id = %chat.id, "Saved chat");
        Ok(chat)
    }

    async fn get_chat(&self, chat_id: Uuid) -> Result<Option<Chat>> {
        let sql = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_chat).transpose()
    }

    async fn list_chats(&self, user_id: &str, page: ChatPage) -> Result<ChatList> {
        let limit = page.limit.clamp(1, ChatPage::MAX_LIMIT);
        // one extra row tells whether another page exists
        let fetch = (limit + 1) as i64;

        let rows = if let Some(cursor) = page.starting_after {
            let at = self.chat_created_at(cursor).await?;
            let sql = format!(
                "SELECT {CHAT_COLUMNS} FROM chats WHERE user_id = $1 AND created_at < $2 \
                 ORDER BY created_at DESC LIMIT $3"
            );
            sqlx::query(&sql)
                .bind(user_id)
                .bind(at)
                .bind(fetch)
                .fetch_all(&self.pool)
                .await?
        } else if let Some(cursor) = page.ending_before {
            let at = self.chat_created_at(cursor).await?;
            let sql = format!(
                "SELECT {CHAT_COLUMNS} FROM (\
                   SELECT {CHAT_COLUMNS} FROM chats WHERE user_id = $1 AND created_at > $2 \
                   ORDER BY created_at ASC LIMIT $3\
                 ) page ORDER BY created_at DESC"
            );
            sqlx::query(&sql)
                .bind(user_id)
                .bind(at)
                .bind(fetch)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT {CHAT_COLUMNS} FROM chats WHERE user_id = $1 \
                 ORDER BY created_at DESC LIMIT $2"
            );
            sqlx::query(&sql)
                .bind(user_id)
                .bind(fetch)
                .fetch_all(&self.pool)
                .await?
        };

        let mut chats = rows.iter().map(row_to_chat).collect::<Result<Vec<_>>>()?;
        let has_more = chats.len() > limit;
        if has_more {
            if page.ending_before.is_some() {
                // the extra row is the one furthest from the cursor
                chats.remove(0);
            } else {
                chats.truncate(limit);
            }
        }

        Ok(ChatList { chats, has_more })
    }

    async fn delete_chat(&self, chat_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM votes WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(PersistError::ChatNotFound(chat_id.to_string()));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_chat_visibility(&self, chat_id: Uuid, visibility: Visibility) -> Result<()> {
        let updated = sqlx::query("UPDATE chats SET visibility = $2, updated_at = NOW() WHERE id = $1")
            .bind(chat_id)
            .bind(visibility.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(PersistError::ChatNotFound(chat_id.to_string()));
        }
        Ok(())
    }

    async fn save_message(&self, message: DBMessage) -> Result<()> {
        sqlx::query(
            "INSERT INTO messages (id, chat_id, user_id, role, message_type, content, \
             tool_call_id, tool_name, arguments, created_at, duration_ms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(message.id)
        .bind(message.chat_id)
        .bind(&message.user_id)
        .bind(message.role.as_str())
        .bind(message.message_type.as_str())
        .bind(&message.content)
        .bind(&message.tool_call_id)
        .bind(&message.tool_name)
        .bind(&message.arguments)
        .bind(message.created_at)
        .bind(message.duration_ms.map(|d| d as i64))
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE chats SET updated_at = NOW() WHERE id = $1")
            .bind(message.chat_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_message(&self, message_id: Uuid) -> Result<Option<DBMessage>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_message).transpose()
    }

    async fn get_messages(
        &self,
        chat_id: Uuid,
        limit: Option<usize>,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<DBMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM (\
               SELECT {MESSAGE_COLUMNS}, seq FROM messages \
               WHERE chat_id = $1 AND ($2::timestamptz IS NULL OR created_at < $2) \
               ORDER BY created_at DESC, seq DESC LIMIT $3\
             ) recent ORDER BY created_at ASC, seq ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(chat_id)
            .bind(before)
            .bind(limit.map(|l| l as i64))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_message).collect()
    }

    async fn delete_messages_after(&self, chat_id: Uuid, after: DateTime<Utc>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM votes WHERE chat_id = $1 AND message_id IN \
             (SELECT id FROM messages WHERE chat_id = $1 AND created_at >= $2)",
        )
        .bind(chat_id)
        .bind(after)
        .execute(&mut *tx)
        .await?;
        let deleted = sqlx::query("DELETE FROM messages WHERE chat_id = $1 AND created_at >= $2")
            .bind(chat_id)
            .bind(after)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted)
    }

    async fn count_user_messages_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE user_id = $1 AND role = 'user' AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn vote_message(&self, vote: Vote) -> Result<()> {
        sqlx::query(
            "INSERT INTO votes (chat_id, message_id, is_upvoted) VALUES ($1, $2, $3) \
             ON CONFLICT (chat_id, message_id) DO UPDATE SET is_upvoted = EXCLUDED.is_upvoted",
        )
        .bind(vote.chat_id)
        .bind(vote.message_id)
        .bind(vote.is_upvoted)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_votes(&self, chat_id: Uuid) -> Result<Vec<Vote>> {
        let rows = sqlx::query("SELECT chat_id, message_id, is_upvoted FROM votes WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_vote).collect()
    }

    async fn save_document(&self, document: Document) -> Result<Document> {
        sqlx::query(
            "INSERT INTO documents (id, created_at, title, content, kind, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(document.id)
        .bind(document.created_at)
        .bind(&document.title)
        .bind(&document.content)
        .bind(document.kind.as_str())
        .bind(&document.user_id)
        .execute(&self.pool)
        .await?;

        debug!(document_id = %document.id, "Saved document version");
        Ok(document)
    }

    async fn get_documents(&self, document_id: Uuid) -> Result<Vec<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1 ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn get_latest_document(&self, document_id: Uuid) -> Result<Option<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1 \
             ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn delete_documents_after(
        &self,
        document_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<Document>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM suggestions WHERE document_id = $1 AND document_created_at > $2")
            .bind(document_id)
            .bind(timestamp)
            .execute(&mut *tx)
            .await?;
        let sql = format!(
            "DELETE FROM documents WHERE id = $1 AND created_at > $2 RETURNING {DOCUMENT_COLUMNS}"
        );
        let rows = sqlx::query(&sql)
            .bind(document_id)
            .bind(timestamp)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn save_suggestions(&self, suggestions: Vec<Suggestion>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for s in &suggestions {
            sqlx::query(
                "INSERT INTO suggestions (id, document_id, document_created_at, original_text, \
                 suggested_text, description, is_resolved, user_id, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(s.id)
            .bind(s.document_id)
            .bind(s.document_created_at)
            .bind(&s.original_text)
            .bind(&s.suggested_text)
            .bind(&s.description)
            .bind(s.is_resolved)
            .bind(&s.user_id)
            .bind(s.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_suggestions(&self, document_id: Uuid) -> Result<Vec<Suggestion>> {
        let sql = format!(
            "SELECT {SUGGESTION_COLUMNS} FROM suggestions WHERE document_id = $1 ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_suggestion).collect()
    }
}
