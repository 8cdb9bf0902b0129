pub mod chats;
pub mod documents;
pub mod health;
pub mod messages;
pub mod openapi;
pub mod votes;

use parley_persist::Chat;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Chat that `user_id` may read: their own, or anyone's public one
pub(crate) async fn load_visible_chat(state: &AppState, chat_id: Uuid, user_id: &str) -> ApiResult<Chat> {
    let chat = load_chat(state, chat_id).await?;
    if !chat.is_visible_to(Some(user_id)) {
        return Err(ApiError::Forbidden("chat is private".to_string()));
    }
    Ok(chat)
}

/// Chat that `user_id` may modify
pub(crate) async fn load_owned_chat(state: &AppState, chat_id: Uuid, user_id: &str) -> ApiResult<Chat> {
    let chat = load_chat(state, chat_id).await?;
    if !chat.is_owned_by(user_id) {
        return Err(ApiError::Forbidden("chat belongs to another user".to_string()));
    }
    Ok(chat)
}

async fn load_chat(state: &AppState, chat_id: Uuid) -> ApiResult<Chat> {
    state
        .persist
        .get_chat(chat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("chat {}", chat_id)))
}
