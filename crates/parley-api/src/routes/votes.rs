use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use parley_persist::Vote;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{chats::UserQuery, load_owned_chat};
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoteRequest {
    pub user_id: String,
    pub message_id: Uuid,
    #[serde(rename = "type")]
    pub vote_type: VoteType,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoteResponse {
    pub chat_id: Uuid,
    pub message_id: Uuid,
    pub is_upvoted: bool,
}

impl From<Vote> for VoteResponse {
    fn from(vote: Vote) -> Self {
        Self {
            chat_id: vote.chat_id,
            message_id: vote.message_id,
            is_upvoted: vote.is_upvoted,
        }
    }
}

/// Votes on a chat's messages
#[utoipa::path(
    get,
    path = "/chats/{chat_id}/votes",
    params(("chat_id" = Uuid, Path, description = "Chat ID"), UserQuery),
    responses(
        (status = 200, description = "Votes", body = [VoteResponse]),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Chat not found")
    ),
    tag = "votes"
)]
pub async fn get_votes(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<VoteResponse>>> {
    load_owned_chat(&state, chat_id, &query.user_id).await?;
    let votes = state.persist.get_votes(chat_id).await?;
    Ok(Json(votes.into_iter().map(VoteResponse::from).collect()))
}

/// Up- or down-vote an assistant message; voting again overwrites
#[utoipa::path(
    patch,
    path = "/chats/{chat_id}/votes",
    params(("chat_id" = Uuid, Path, description = "Chat ID")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Chat or message not found")
    ),
    tag = "votes"
)]
pub async fn vote_message(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<StatusCode> {
    load_owned_chat(&state, chat_id, &req.user_id).await?;

    let message = state
        .persist
        .get_message(req.message_id)
        .await?
        .filter(|m| m.chat_id == chat_id)
        .ok_or_else(|| ApiError::NotFound(format!("message {}", req.message_id)))?;

    state
        .persist
        .vote_message(Vote {
            chat_id,
            message_id: message.id,
            is_upvoted: req.vote_type == VoteType::Up,
        })
        .await?;

    Ok(StatusCode::OK)
}
