use anyhow::{Context, Result};
use async_trait::async_trait;
use parley_persist::Document;
use parley_types::{ArtifactEvent, ArtifactKind};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::{prompts, stream_artifact};
use crate::context::ToolContext;
use crate::handler::ToolHandler;

#[derive(Debug, Deserialize)]
struct CreateArgs {
    title: String,
    #[serde(default = "default_kind")]
    kind: ArtifactKind,
}

fn default_kind() -> ArtifactKind {
    ArtifactKind::Text
}

pub struct CreateDocumentTool;

#[async_trait]
impl ToolHandler for CreateDocumentTool {
    fn name(&self) -> &str {
        "create_document"
    }

    fn description(&self) -> &str {
        "Create a document for writing or content creation activities. The document \
         content is generated from the title and kind and shown to the user."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "kind": { "type": "string", "enum": ["text", "code", "sheet"] }
            },
            "required": ["title", "kind"]
        })
    }

    async fn call(&self, arguments: Value, ctx: &ToolContext) -> Result<Value> {
        let args: CreateArgs =
            serde_json::from_value(arguments).context("create_document expects title and kind")?;
        let user_id = ctx.require_user()?.to_string();
        let persist = ctx.require_persist()?.clone();

        let id = Uuid::new_v4();
        ctx.emit_artifact(ArtifactEvent::Kind { artifact_kind: args.kind }).await?;
        ctx.emit_artifact(ArtifactEvent::Id { id: id.to_string() }).await?;
        ctx.emit_artifact(ArtifactEvent::Title { title: args.title.clone() }).await?;
        ctx.emit_artifact(ArtifactEvent::Clear).await?;

        let content = stream_artifact(
            ctx,
            args.kind,
            prompts::create_prompt(args.kind),
            args.title.clone(),
        )
        .await?;

        persist
            .save_document(Document::new(id, &args.title, args.kind, content, user_id))
            .await
            .context("Failed to save document")?;

        ctx.emit_artifact(ArtifactEvent::Finish).await?;
        info!(document_id = %id, kind = %args.kind, "Document created");

        Ok(json!({
            "id": id,
            "title": args.title,
            "kind": args.kind,
            "content": "A document was created and is now visible to the user."
        }))
    }
}
