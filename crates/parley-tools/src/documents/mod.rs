//! Artifact tools: documents the model writes and revises while the user
//! watches them stream into a side panel.

mod create;
mod prompts;
mod suggestions;
mod update;

pub use create::CreateDocumentTool;
pub use suggestions::RequestSuggestionsTool;
pub use update::UpdateDocumentTool;

use anyhow::{Context, Result};
use futures::StreamExt;
use parley_llm::{ChatOptions, ChatRequest, Message, StreamEvent as LlmEvent};
use parley_types::{ArtifactEvent, ArtifactKind};
use uuid::Uuid;

use crate::context::ToolContext;

/// Stream a nested generation into the artifact panel and return the full text
async fn stream_artifact(
    ctx: &ToolContext,
    kind: ArtifactKind,
    system_prompt: String,
    user_prompt: String,
) -> Result<String> {
    let request = ChatRequest::new(
        ctx.artifact_model.clone(),
        vec![Message::system(system_prompt), Message::human(user_prompt)],
    )
    .with_options(ChatOptions::new());

    let mut stream = ctx
        .llm
        .chat_stream(request)
        .await
        .context("Failed to start document generation")?;

    let mut content = String::new();
    while let Some(event) = stream.next().await {
        if let LlmEvent::Message { content: delta } = event? {
            if delta.is_empty() {
                continue;
            }
            content.push_str(&delta);
            ctx.emit_artifact(ArtifactEvent::delta(kind, delta)).await?;
        }
    }

    Ok(strip_code_fence(&content))
}

/// Models often wrap code and CSV in a markdown fence despite instructions
fn strip_code_fence(content: &str) -> String {
    let trimmed = content.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(body) = rest.strip_suffix("```") {
            // drop the language tag line
            let body = body.split_once('\n').map(|(_, b)| b).unwrap_or(body);
            return body.trim_end().to_string();
        }
    }
    content.to_string()
}

fn parse_document_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("Invalid document id '{}'", raw))
}
