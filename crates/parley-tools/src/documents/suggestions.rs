use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parley_llm::{ChatOptions, ChatRequest, Message};
use parley_persist::Suggestion;
use parley_types::{ArtifactEvent, SuggestionDelta};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{parse_document_id, prompts};
use crate::context::ToolContext;
use crate::handler::ToolHandler;

const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Deserialize)]
struct SuggestionArgs {
    document_id: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedSuggestion {
    original_sentence: String,
    suggested_sentence: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeneratedSuggestions {
    Wrapped { suggestions: Vec<GeneratedSuggestion> },
    Bare(Vec<GeneratedSuggestion>),
}

impl GeneratedSuggestions {
    fn into_vec(self) -> Vec<GeneratedSuggestion> {
        match self {
            Self::Wrapped { suggestions } => suggestions,
            Self::Bare(list) => list,
        }
    }
}

pub struct RequestSuggestionsTool;

#[async_trait]
impl ToolHandler for RequestSuggestionsTool {
    fn name(&self) -> &str {
        "request_suggestions"
    }

    fn description(&self) -> &str {
        "Request suggestions for a document"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "document_id": { "type": "string", "description": "The ID of the document to request edits" }
            },
            "required": ["document_id"]
        })
    }

    async fn call(&self, arguments: Value, ctx: &ToolContext) -> Result<Value> {
        let args: SuggestionArgs =
            serde_json::from_value(arguments).context("request_suggestions expects document_id")?;
        let user_id = ctx.require_user()?.to_string();
        let persist = ctx.require_persist()?.clone();

        let id = parse_document_id(&args.document_id)?;
        let document = persist
            .get_latest_document(id)
            .await?
            .ok_or_else(|| anyhow!("Document not found"))?;

        let request = ChatRequest::new(
            ctx.artifact_model.clone(),
            vec![
                Message::system(prompts::SUGGESTIONS_PROMPT),
                Message::human(document.content.clone()),
            ],
        )
        .with_options(ChatOptions::new().json_mode(true));

        let response = ctx
            .llm
            .chat(request)
            .await
            .context("Suggestion generation failed")?;
        let raw = response.content.unwrap_or_default();
        let generated: GeneratedSuggestions =
            serde_json::from_str(raw.trim()).context("Suggestion response was not valid JSON")?;

        let mut saved = Vec::new();
        for item in generated.into_vec().into_iter().take(MAX_SUGGESTIONS) {
            if item.original_sentence.trim().is_empty() {
                warn!(document_id = %id, "Skipping suggestion without original sentence");
                continue;
            }
            let suggestion = Suggestion::for_document(
                &document,
                item.original_sentence,
                item.suggested_sentence,
                item.description,
                user_id.clone(),
            );
            ctx.emit_artifact(ArtifactEvent::Suggestion {
                suggestion: SuggestionDelta {
                    id: suggestion.id.to_string(),
                    document_id: suggestion.document_id.to_string(),
                    original_text: suggestion.original_text.clone(),
                    suggested_text: suggestion.suggested_text.clone(),
                    description: suggestion.description.clone(),
                    is_resolved: false,
                },
            })
            .await?;
            saved.push(suggestion);
        }

        let count = saved.len();
        persist
            .save_suggestions(saved)
            .await
            .context("Failed to save suggestions")?;
        info!(document_id = %id, count, "Suggestions added");

        Ok(json!({
            "id": document.id,
            "title": document.title,
            "kind": document.kind,
            "message": format!("{} suggestions have been added to the document", count)
        }))
    }
}
