use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::error::{PersistError, Result};
use crate::models::{Chat, DBMessage, Document, Suggestion, Vote};

pub(super) fn row_to_chat(row: &PgRow) -> Result<Chat> {
    let visibility: String = row.try_get("visibility")?;
    Ok(Chat {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        visibility: visibility.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn row_to_message(row: &PgRow) -> Result<DBMessage> {
    let role: String = row.try_get("role")?;
    let message_type: String = row.try_get("message_type")?;
    let duration_ms: Option<i64> = row.try_get("duration_ms")?;
    Ok(DBMessage {
        id: row.try_get("id")?,
        chat_id: row.try_get("chat_id")?,
        user_id: row.try_get("user_id")?,
        role: role.parse()?,
        message_type: message_type.parse()?,
        content: row.try_get("content")?,
        tool_call_id: row.try_get("tool_call_id")?,
        tool_name: row.try_get("tool_name")?,
        arguments: row.try_get("arguments")?,
        created_at: row.try_get("created_at")?,
        duration_ms: duration_ms.map(|d| d.max(0) as u64),
    })
}

pub(super) fn row_to_vote(row: &PgRow) -> Result<Vote> {
    Ok(Vote {
        chat_id: row.try_get("chat_id")?,
        message_id: row.try_get("message_id")?,
        is_upvoted: row.try_get("is_upvoted")?,
    })
}

pub(super) fn row_to_document(row: &PgRow) -> Result<Document> {
    let kind: String = row.try_get("kind")?;
    Ok(Document {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        kind: kind
            .parse()
            .map_err(|_| PersistError::InvalidData(format!("document kind '{}'", kind)))?,
        user_id: row.try_get("user_id")?,
    })
}

pub(super) fn row_to_suggestion(row: &PgRow) -> Result<Suggestion> {
    Ok(Suggestion {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        document_created_at: row.try_get("document_created_at")?,
        original_text: row.try_get("original_text")?,
        suggested_text: row.try_get("suggested_text")?,
        description: row.try_get("description")?,
        is_resolved: row.try_get("is_resolved")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
    })
}
