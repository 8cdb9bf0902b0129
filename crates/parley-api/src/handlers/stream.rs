use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::{Duration, Utc};
use futures::stream::{Stream, StreamExt};
use parley_context::{generate_title, system_prompt, RequestHints};
use parley_graph::{GraphInput, LLMConfig, StreamEvent};
use parley_persist::{Chat, DBMessage};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::ChatModel,
    error::{ApiError, ApiResult},
    routes::chats::parse_visibility,
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub user_id: String,
    /// Client-generated id for the user message
    #[serde(default)]
    pub message_id: Option<Uuid>,
    pub content: String,
    /// One of the configured model ids; defaults to `llm.default_model`
    #[serde(default)]
    pub model: Option<String>,
    /// Visibility for a chat created by this request
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub request_hints: Option<RequestHints>,
}

/// Send a message and stream the response using Server-Sent Events
///
/// Creates the chat on first use. Every loop event becomes one SSE event
/// named after its type (`message`, `tool_call`, `artifact`, ...), starting
/// with `init_stream` and ending with `end_stream`.
#[utoipa::path(
    post,
    path = "/chats/{chat_id}/messages",
    params(("chat_id" = Uuid, Path, description = "Chat ID")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Streaming response", content_type = "text/event-stream"),
        (status = 400, description = "Empty message or unknown model"),
        (status = 403, description = "Chat belongs to another user"),
        (status = 429, description = "Daily message allowance used up")
    ),
    tag = "messages"
)]
pub async fn send_message_stream(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("message content is empty".to_string()));
    }

    // 1. Resolve the model
    let model_id = req.model.as_deref().unwrap_or(state.config.llm.default_model.as_str());
    let model = state
        .config
        .llm
        .find_model(model_id)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown model '{}'", model_id)))?
        .clone();

    // 2. Entitlement
    let since = Utc::now() - Duration::hours(24);
    let sent = state.persist.count_user_messages_since(&req.user_id, since).await?;
    if sent >= state.config.chat.max_messages_per_day {
        tracing::info!(user_id = %req.user_id, sent, "Daily message allowance exhausted");
        return Err(ApiError::RateLimited(format!(
            "at most {} messages per day",
            state.config.chat.max_messages_per_day
        )));
    }

    if let Some(id) = req.message_id {
        if state.persist.get_message(id).await?.is_some() {
            return Err(ApiError::BadRequest(format!("message {} already exists", id)));
        }
    }

    // 3. Load or create the chat
    match state.persist.get_chat(chat_id).await? {
        Some(chat) if !chat.is_owned_by(&req.user_id) => {
            return Err(ApiError::Forbidden("chat belongs to another user".to_string()));
        }
        Some(_) => {}
        None => create_chat(&state, chat_id, &req).await?,
    }

    // 4. Save the user message
    let mut user_message = DBMessage::user(chat_id, req.user_id.clone(), req.content.clone());
    if let Some(id) = req.message_id {
        user_message.id = id;
    }
    state.persist.save_message(user_message).await?;

    // 5. Context window (includes the message just saved)
    let tools_enabled = !model.reasoning;
    let prompt = system_prompt(req.request_hints.as_ref(), tools_enabled);
    let window = state
        .context_strategy
        .get_context_window(chat_id, prompt, state.persist.as_ref())
        .await?;

    // 6. Run the loop
    let input = GraphInput::new(chat_id, window.into_messages(), llm_config_for(&state, &model))
        .with_user(req.user_id.clone());
    tracing::info!(chat_id = %chat_id, model = %model.id, "Starting chat run");

    let events = state.graph.spawn_run(input);
    let sse_stream = ReceiverStream::new(events).map(|event| Ok::<Event, Infallible>(to_sse_event(&event)));

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

async fn create_chat(state: &AppState, chat_id: Uuid, req: &SendMessageRequest) -> ApiResult<()> {
    let visibility = req
        .visibility
        .as_deref()
        .map(parse_visibility)
        .transpose()?
        .unwrap_or_default();

    let title = generate_title(state.llm_client.as_ref(), &state.config.llm.title_model, &req.content)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default chat title");
            "New chat".to_string()
        });

    let chat = Chat::new(req.user_id.clone(), title)
        .with_id(chat_id)
        .with_visibility(visibility);
    state.persist.save_chat(chat).await?;
    tracing::info!(chat_id = %chat_id, "Chat created from first message");
    Ok(())
}

fn llm_config_for(state: &AppState, model: &ChatModel) -> LLMConfig {
    let mut cfg = LLMConfig::new(model.id.clone())
        .with_tools_enabled(!model.reasoning)
        .with_reasoning(model.reasoning);
    if let Some(temp) = state.config.llm.temperature {
        cfg = cfg.with_temperature(temp);
    }
    cfg
}

/// One named SSE event per loop event; the JSON payload keeps the `type` tag
pub fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(event)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, event = event.name(), "Failed to encode SSE event");
            Event::default()
                .event("error")
                .data(r#"{"type":"error","message":"event encoding failed"}"#)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_graph::EndStatus;

    #[test]
    fn test_sse_event_named_after_type() {
        let event = to_sse_event(&StreamEvent::EndStream {
            status: EndStatus::Success,
            total_duration_ms: 4,
        });
        let rendered = format!("{:?}", event);
        assert!(rendered.contains("end_stream"));
    }
}
