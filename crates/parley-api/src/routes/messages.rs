use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use parley_persist::DBMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{load_owned_chat, load_visible_chat};
use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMessagesQuery {
    pub user_id: String,
    /// Keep only the most recent `limit` messages
    pub limit: Option<usize>,
    /// Only messages created before this instant (RFC 3339)
    pub before: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: String,
    pub message_type: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl From<DBMessage> for MessageResponse {
    fn from(msg: DBMessage) -> Self {
        Self {
            id: msg.id,
            chat_id: msg.chat_id,
            role: msg.role.as_str().to_string(),
            message_type: msg.message_type.as_str().to_string(),
            content: msg.content,
            tool_call_id: msg.tool_call_id,
            tool_name: msg.tool_name,
            arguments: msg.arguments,
            duration_ms: msg.duration_ms,
            created_at: msg.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListMessagesResponse {
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteTrailingQuery {
    pub user_id: String,
    /// Messages created at or after this instant are removed (RFC 3339)
    pub after: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteTrailingResponse {
    pub deleted: u64,
}

/// List the transcript of a chat
#[utoipa::path(
    get,
    path = "/chats/{chat_id}/messages",
    params(("chat_id" = Uuid, Path, description = "Chat ID"), ListMessagesQuery),
    responses(
        (status = 200, description = "Messages, oldest first", body = ListMessagesResponse),
        (status = 403, description = "Private chat of another user"),
        (status = 404, description = "Chat not found")
    ),
    tag = "messages"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<Uuid>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Json<ListMessagesResponse>> {
    load_visible_chat(&state, chat_id, &query.user_id).await?;

    let messages = state
        .persist
        .get_messages(chat_id, query.limit, query.before)
        .await?;

    Ok(Json(ListMessagesResponse {
        messages: messages.into_iter().map(MessageResponse::from).collect(),
    }))
}

/// Delete trailing messages, used when a message is edited or regenerated
#[utoipa::path(
    delete,
    path = "/chats/{chat_id}/messages",
    params(("chat_id" = Uuid, Path, description = "Chat ID"), DeleteTrailingQuery),
    responses(
        (status = 200, description = "Number of removed messages", body = DeleteTrailingResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Chat not found")
    ),
    tag = "messages"
)]
pub async fn delete_trailing_messages(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<Uuid>,
    Query(query): Query<DeleteTrailingQuery>,
) -> ApiResult<Json<DeleteTrailingResponse>> {
    load_owned_chat(&state, chat_id, &query.user_id).await?;

    let deleted = state.persist.delete_messages_after(chat_id, query.after).await?;
    tracing::info!(chat_id = %chat_id, deleted, "Trailing messages deleted");

    Ok(Json(DeleteTrailingResponse { deleted }))
}
