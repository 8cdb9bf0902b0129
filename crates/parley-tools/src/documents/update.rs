use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parley_types::ArtifactEvent;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{parse_document_id, prompts, stream_artifact};
use crate::context::ToolContext;
use crate::handler::ToolHandler;

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    id: String,
    description: String,
}

pub struct UpdateDocumentTool;

#[async_trait]
impl ToolHandler for UpdateDocumentTool {
    fn name(&self) -> &str {
        "update_document"
    }

    fn description(&self) -> &str {
        "Update a document with the given description."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "The ID of the document to update" },
                "description": { "type": "string", "description": "The description of changes that need to be made" }
            },
            "required": ["id", "description"]
        })
    }

    async fn call(&self, arguments: Value, ctx: &ToolContext) -> Result<Value> {
        let args: UpdateArgs =
            serde_json::from_value(arguments).context("update_document expects id and description")?;
        ctx.require_user()?;
        let persist = ctx.require_persist()?.clone();

        let id = parse_document_id(&args.id)?;
        let current = persist
            .get_latest_document(id)
            .await?
            .ok_or_else(|| anyhow!("Document not found"))?;

        ctx.emit_artifact(ArtifactEvent::Clear).await?;

        let content = stream_artifact(
            ctx,
            current.kind,
            prompts::update_prompt(current.kind, &current.content),
            args.description,
        )
        .await?;

        let next = persist
            .save_document(current.next_version(content))
            .await
            .context("Failed to save document version")?;

        ctx.emit_artifact(ArtifactEvent::Finish).await?;
        info!(document_id = %id, version = %next.created_at, "Document updated");

        Ok(json!({
            "id": next.id,
            "title": next.title,
            "kind": next.kind,
            "content": "The document has been updated successfully."
        }))
    }
}
