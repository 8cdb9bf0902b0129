use anyhow::{Context, Result};
use async_trait::async_trait;
use parley_llm::ChatClient;
use parley_persist::PersistenceClient;
use parley_tools::{ToolContext, ToolRegistry};
use parley_types::{GraphOutput, GraphState, StreamEvent};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use crate::node::{EventSender, Node, NodeType};

pub struct ToolNode {
    tools: Arc<ToolRegistry>,
    llm_client: Arc<dyn ChatClient>,
    artifact_model: String,
    persist: Option<Arc<dyn PersistenceClient>>,
}

impl ToolNode {
    pub fn new(
        tools: Arc<ToolRegistry>,
        llm_client: Arc<dyn ChatClient>,
        artifact_model: impl Into<String>,
        persist: Option<Arc<dyn PersistenceClient>>,
    ) -> Self {
        Self {
            tools,
            llm_client,
            artifact_model: artifact_model.into(),
            persist,
        }
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn execute(&self, state: &mut GraphState, event_tx: EventSender) -> Result<()> {
        let tool_calls = state.get_pending_tool_calls();
        if tool_calls.is_empty() {
            state.last_outputs = None;
            return Ok(());
        }

        let ctx = ToolContext::new(
            state.chat_id,
            event_tx.clone(),
            Arc::clone(&self.llm_client),
            self.artifact_model.clone(),
        )
        .with_user(state.user_id.clone())
        .with_persistence(self.persist.clone());

        let mut outputs = Vec::with_capacity(tool_calls.len());

        for tool_call in tool_calls {
            let start = Instant::now();
            let name = tool_call.function.name.clone();

            // failures become the tool result so the model can react
            let (result, is_error) = match self
                .tools
                .execute_tool(&name, &tool_call.function.arguments, &ctx)
                .await
            {
                Ok(result) => (result, false),
                Err(e) => {
                    warn!(tool = %name, error = %e, "Tool execution failed");
                    (format!("Tool execution failed: {:#}", e), true)
                }
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            event_tx
                .send(StreamEvent::ToolResult {
                    tool_call_id: tool_call.id.clone(),
                    tool_name: name.clone(),
                    result: result.clone(),
                    is_error,
                    duration_ms,
                })
                .await
                .context("Event receiver dropped")?;

            state.add_tool_result(tool_call.id.clone(), result.clone());
            outputs.push(GraphOutput::ToolResult {
                tool_call_id: tool_call.id,
                tool_name: name,
                content: result,
                is_error,
                duration_ms,
            });
        }

        state.last_outputs = Some(outputs);
        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::Tool
    }
}
