use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of document an artifact tool produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Text,
    Code,
    Sheet,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Sheet => "sheet",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "code" => Ok(Self::Code),
            "sheet" => Ok(Self::Sheet),
            other => Err(format!("unknown artifact kind: {}", other)),
        }
    }
}

/// Side-channel updates for the document panel, emitted by artifact tools
/// while the tool call is still running
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactEvent {
    Kind { artifact_kind: ArtifactKind },
    Id { id: String },
    Title { title: String },
    /// Discard whatever the panel currently shows
    Clear,
    TextDelta { delta: String },
    CodeDelta { delta: String },
    SheetDelta { delta: String },
    Suggestion { suggestion: SuggestionDelta },
    Finish,
}

impl ArtifactEvent {
    /// Content delta event matching the document kind
    pub fn delta(kind: ArtifactKind, delta: impl Into<String>) -> Self {
        let delta = delta.into();
        match kind {
            ArtifactKind::Text => Self::TextDelta { delta },
            ArtifactKind::Code => Self::CodeDelta { delta },
            ArtifactKind::Sheet => Self::SheetDelta { delta },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionDelta {
    pub id: String,
    pub document_id: String,
    pub original_text: String,
    pub suggested_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_resolved: bool,
}
