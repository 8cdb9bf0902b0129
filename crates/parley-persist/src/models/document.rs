use chrono::{DateTime, Utc};
use parley_types::ArtifactKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One version of a document. Versions share `id` and differ by `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub content: String,
    pub kind: ArtifactKind,
    pub user_id: String,
}

impl Document {
    pub fn new(
        id: Uuid,
        title: impl Into<String>,
        kind: ArtifactKind,
        content: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            title: title.into(),
            content: content.into(),
            kind,
            user_id: user_id.into(),
        }
    }

    /// Same document, new content, fresh version timestamp
    pub fn next_version(&self, content: impl Into<String>) -> Self {
        Self {
            id: self.id,
            created_at: Utc::now(),
            title: self.title.clone(),
            content: content.into(),
            kind: self.kind,
            user_id: self.user_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub document_created_at: DateTime<Utc>,
    pub original_text: String,
    pub suggested_text: String,
    pub description: Option<String>,
    pub is_resolved: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    pub fn for_document(
        document: &Document,
        original_text: impl Into<String>,
        suggested_text: impl Into<String>,
        description: Option<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: document.id,
            document_created_at: document.created_at,
            original_text: original_text.into(),
            suggested_text: suggested_text.into(),
            description,
            is_resolved: false,
            user_id: user_id.into(),
            created_at: Utc::now(),
        }
    }
}
