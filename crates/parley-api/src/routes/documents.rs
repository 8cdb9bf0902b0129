use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use parley_persist::{Document, Suggestion};
use parley_types::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::chats::UserQuery;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub content: String,
    /// `text`, `code` or `sheet`
    pub kind: String,
    pub user_id: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            created_at: doc.created_at,
            title: doc.title,
            content: doc.content,
            kind: doc.kind.to_string(),
            user_id: doc.user_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveDocumentRequest {
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub kind: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteVersionsQuery {
    pub user_id: String,
    /// Versions created after this instant are removed (RFC 3339)
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuggestionResponse {
    pub id: Uuid,
    pub document_id: Uuid,
    pub document_created_at: DateTime<Utc>,
    pub original_text: String,
    pub suggested_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Suggestion> for SuggestionResponse {
    fn from(s: Suggestion) -> Self {
        Self {
            id: s.id,
            document_id: s.document_id,
            document_created_at: s.document_created_at,
            original_text: s.original_text,
            suggested_text: s.suggested_text,
            description: s.description,
            is_resolved: s.is_resolved,
            created_at: s.created_at,
        }
    }
}

/// All versions of a document, owner check included
async fn load_owned_versions(state: &AppState, document_id: Uuid, user_id: &str) -> ApiResult<Vec<Document>> {
    let versions = state.persist.get_documents(document_id).await?;
    let first = versions
        .first()
        .ok_or_else(|| ApiError::NotFound(format!("document {}", document_id)))?;
    if first.user_id != user_id {
        return Err(ApiError::Forbidden("document belongs to another user".to_string()));
    }
    Ok(versions)
}

/// Every saved version of a document, oldest first
#[utoipa::path(
    get,
    path = "/documents/{document_id}",
    params(("document_id" = Uuid, Path, description = "Document ID"), UserQuery),
    responses(
        (status = 200, description = "Document versions", body = [DocumentResponse]),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Document not found")
    ),
    tag = "documents"
)]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<DocumentResponse>>> {
    let versions = load_owned_versions(&state, document_id, &query.user_id).await?;
    Ok(Json(versions.into_iter().map(DocumentResponse::from).collect()))
}

/// Save a new version of a document (manual edit from the artifact panel)
#[utoipa::path(
    post,
    path = "/documents/{document_id}",
    params(("document_id" = Uuid, Path, description = "Document ID")),
    request_body = SaveDocumentRequest,
    responses(
        (status = 200, description = "Saved version", body = DocumentResponse),
        (status = 400, description = "Unknown kind"),
        (status = 403, description = "Not the owner")
    ),
    tag = "documents"
)]
pub async fn save_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
    Json(req): Json<SaveDocumentRequest>,
) -> ApiResult<Json<DocumentResponse>> {
    let kind: ArtifactKind = req.kind.parse().map_err(ApiError::BadRequest)?;

    if let Some(latest) = state.persist.get_latest_document(document_id).await? {
        if latest.user_id != req.user_id {
            return Err(ApiError::Forbidden("document belongs to another user".to_string()));
        }
    }

    let document = state
        .persist
        .save_document(Document::new(document_id, req.title, kind, req.content, req.user_id))
        .await?;

    Ok(Json(document.into()))
}

/// Drop versions newer than `timestamp` along with their suggestions
#[utoipa::path(
    delete,
    path = "/documents/{document_id}",
    params(("document_id" = Uuid, Path, description = "Document ID"), DeleteVersionsQuery),
    responses(
        (status = 200, description = "Removed versions", body = [DocumentResponse]),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Document not found")
    ),
    tag = "documents"
)]
pub async fn delete_document_versions(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
    Query(query): Query<DeleteVersionsQuery>,
) -> ApiResult<Json<Vec<DocumentResponse>>> {
    load_owned_versions(&state, document_id, &query.user_id).await?;

    let removed = state
        .persist
        .delete_documents_after(document_id, query.timestamp)
        .await?;
    tracing::info!(document_id = %document_id, removed = removed.len(), "Document versions deleted");

    Ok(Json(removed.into_iter().map(DocumentResponse::from).collect()))
}

/// Suggestions attached to any version of a document
#[utoipa::path(
    get,
    path = "/documents/{document_id}/suggestions",
    params(("document_id" = Uuid, Path, description = "Document ID"), UserQuery),
    responses(
        (status = 200, description = "Suggestions", body = [SuggestionResponse]),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Document not found")
    ),
    tag = "documents"
)]
pub async fn get_suggestions(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<SuggestionResponse>>> {
    load_owned_versions(&state, document_id, &query.user_id).await?;
    let suggestions = state.persist.get_suggestions(document_id).await?;
    Ok(Json(suggestions.into_iter().map(SuggestionResponse::from).collect()))
}
