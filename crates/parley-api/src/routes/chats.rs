use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use parley_persist::{Chat, ChatPage, Visibility};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{load_owned_chat, load_visible_chat};
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateChatRequest {
    pub user_id: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: Option<String>,
    /// `public` or `private` (default)
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub visibility: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            user_id: chat.user_id,
            title: chat.title,
            visibility: chat.visibility.to_string(),
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListChatsQuery {
    pub user_id: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub starting_after: Option<Uuid>,
    pub ending_before: Option<Uuid>,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListChatsResponse {
    pub chats: Vec<ChatResponse>,
    pub has_more: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateVisibilityRequest {
    pub user_id: String,
    pub visibility: String,
}

pub(crate) fn parse_visibility(raw: &str) -> ApiResult<Visibility> {
    raw.parse::<Visibility>()
        .map_err(|_| ApiError::BadRequest(format!("visibility must be 'public' or 'private', got '{}'", raw)))
}

/// Create a new chat
#[utoipa::path(
    post,
    path = "/chats",
    request_body = CreateChatRequest,
    responses(
        (status = 201, description = "Chat created", body = ChatResponse),
        (status = 400, description = "Invalid request")
    ),
    tag = "chats"
)]
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateChatRequest>,
) -> ApiResult<(StatusCode, Json<ChatResponse>)> {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    let visibility = req.visibility.as_deref().map(parse_visibility).transpose()?.unwrap_or_default();

    let mut chat = Chat::new(req.user_id, req.title.unwrap_or_else(|| "New chat".to_string()))
        .with_visibility(visibility);
    if let Some(id) = req.id {
        if state.persist.get_chat(id).await?.is_some() {
            return Err(ApiError::BadRequest(format!("chat {} already exists", id)));
        }
        chat = chat.with_id(id);
    }

    let chat = state.persist.save_chat(chat).await?;
    tracing::info!(chat_id = %chat.id, user_id = %chat.user_id, "Chat created");

    Ok((StatusCode::CREATED, Json(chat.into())))
}

/// List a user's chats, newest first
#[utoipa::path(
    get,
    path = "/chats",
    params(ListChatsQuery),
    responses(
        (status = 200, description = "Page of chats", body = ListChatsResponse),
        (status = 400, description = "Both cursors given")
    ),
    tag = "chats"
)]
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListChatsQuery>,
) -> ApiResult<Json<ListChatsResponse>> {
    let mut page = ChatPage::new(query.limit);
    match (query.starting_after, query.ending_before) {
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(
                "only one of starting_after or ending_before may be given".to_string(),
            ))
        }
        (Some(id), None) => page = page.starting_after(id),
        (None, Some(id)) => page = page.ending_before(id),
        (None, None) => {}
    }

    let list = state.persist.list_chats(&query.user_id, page).await?;

    Ok(Json(ListChatsResponse {
        chats: list.chats.into_iter().map(ChatResponse::from).collect(),
        has_more: list.has_more,
    }))
}

/// Get a chat; private chats are only visible to their owner
#[utoipa::path(
    get,
    path = "/chats/{chat_id}",
    params(("chat_id" = Uuid, Path, description = "Chat ID"), UserQuery),
    responses(
        (status = 200, description = "Chat details", body = ChatResponse),
        (status = 403, description = "Private chat of another user"),
        (status = 404, description = "Chat not found")
    ),
    tag = "chats"
)]
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<ChatResponse>> {
    let chat = load_visible_chat(&state, chat_id, &query.user_id).await?;
    Ok(Json(chat.into()))
}

/// Delete a chat with its messages and votes
#[utoipa::path(
    delete,
    path = "/chats/{chat_id}",
    params(("chat_id" = Uuid, Path, description = "Chat ID"), UserQuery),
    responses(
        (status = 204, description = "Chat deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Chat not found")
    ),
    tag = "chats"
)]
pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> ApiResult<StatusCode> {
    load_owned_chat(&state, chat_id, &query.user_id).await?;
    state.persist.delete_chat(chat_id).await?;
    tracing::info!(chat_id = %chat_id, "Chat deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Make a chat public or private
#[utoipa::path(
    patch,
    path = "/chats/{chat_id}/visibility",
    params(("chat_id" = Uuid, Path, description = "Chat ID")),
    request_body = UpdateVisibilityRequest,
    responses(
        (status = 200, description = "Updated chat", body = ChatResponse),
        (status = 400, description = "Unknown visibility"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Chat not found")
    ),
    tag = "chats"
)]
pub async fn update_visibility(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<Uuid>,
    Json(req): Json<UpdateVisibilityRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let visibility = parse_visibility(&req.visibility)?;
    let mut chat = load_owned_chat(&state, chat_id, &req.user_id).await?;

    state.persist.update_chat_visibility(chat_id, visibility).await?;
    chat.visibility = visibility;

    Ok(Json(chat.into()))
}
