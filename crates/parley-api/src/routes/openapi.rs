use axum::Json;
use utoipa::OpenApi;

use crate::handlers::stream;
use crate::routes::{chats, documents, health, messages, votes};

#[derive(OpenApi)]
#[openapi(
    info(title = "Parley API", description = "Chat backend with a streaming tool-calling loop"),
    paths(
        health::health_check,
        chats::create_chat,
        chats::list_chats,
        chats::get_chat,
        chats::delete_chat,
        chats::update_visibility,
        messages::list_messages,
        messages::delete_trailing_messages,
        stream::send_message_stream,
        votes::get_votes,
        votes::vote_message,
        documents::get_document,
        documents::save_document,
        documents::delete_document_versions,
        documents::get_suggestions,
    ),
    components(schemas(
        health::HealthResponse,
        chats::CreateChatRequest,
        chats::ChatResponse,
        chats::ListChatsResponse,
        chats::UpdateVisibilityRequest,
        messages::MessageResponse,
        messages::ListMessagesResponse,
        messages::DeleteTrailingResponse,
        stream::SendMessageRequest,
        votes::VoteType,
        votes::VoteRequest,
        votes::VoteResponse,
        documents::DocumentResponse,
        documents::SaveDocumentRequest,
        documents::SuggestionResponse,
    )),
    tags(
        (name = "health"),
        (name = "chats"),
        (name = "messages"),
        (name = "votes"),
        (name = "documents"),
    )
)]
pub struct ApiDoc;

/// OpenAPI document for the routes above
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
