use anyhow::Result;
use parley_llm::ChatClient;
use parley_persist::{DBMessage, MessageRole, MessageType, PersistenceClient};
use parley_tools::ToolRegistry;
use parley_types::{EndStatus, GraphConfig, GraphInput, GraphOutput, GraphState, StreamEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::node::{EventSender, Node, NodeType};
use crate::nodes::{LLMNode, ToolNode};
use crate::router::{NextNode, Router, SimpleRouter};

pub struct Graph {
    llm_client: Arc<dyn ChatClient>,
    tools: Arc<ToolRegistry>,
    config: GraphConfig,
    persistence: Option<Arc<dyn PersistenceClient>>,
    artifact_model: String,
}

impl Graph {
    pub fn new(llm_client: Arc<dyn ChatClient>, tools: Arc<ToolRegistry>, config: GraphConfig) -> Self {
        Self {
            llm_client,
            tools,
            config,
            persistence: None,
            artifact_model: String::new(),
        }
    }

    pub(crate) fn new_with_config(
        llm_client: Arc<dyn ChatClient>,
        tools: Arc<ToolRegistry>,
        config: GraphConfig,
        persistence: Option<Arc<dyn PersistenceClient>>,
        artifact_model: String,
    ) -> Self {
        Self {
            llm_client,
            tools,
            config,
            persistence,
            artifact_model,
        }
    }

    /// Create a builder for fluent construction
    pub fn builder() -> crate::builder::GraphBuilder {
        crate::builder::GraphBuilder::new()
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Spawn execution in background, return event receiver.
    ///
    /// The receiver yields `InitStream` first and `EndStream` last. Dropping
    /// it stops the run at its next emitted event.
    pub fn spawn_run(&self, input: GraphInput) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));

        let llm_client = Arc::clone(&self.llm_client);
        let tools = Arc::clone(&self.tools);
        let config = self.config.clone();
        let persistence = self.persistence.clone();
        let artifact_model = if self.artifact_model.is_empty() {
            input.llm_config.model.clone()
        } else {
            self.artifact_model.clone()
        };

        tokio::spawn(async move {
            let start_time = Instant::now();
            let timeout = config.execution_timeout;

            let outcome = tokio::time::timeout(
                timeout,
                Self::execute_loop(input, tx.clone(), llm_client, tools, config, persistence, artifact_model),
            )
            .await;

            let status = match outcome {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    if tx.is_closed() {
                        debug!("Client disconnected, run stopped");
                        return;
                    }
                    error!("Graph execution failed: {:#}", e);
                    let _ = tx
                        .send(StreamEvent::Error {
                            message: format!("{:#}", e),
                            node_id: None,
                        })
                        .await;
                    EndStatus::Error
                }
                Err(_) => {
                    warn!(timeout_ms = timeout.as_millis() as u64, "Graph execution timed out");
                    let _ = tx
                        .send(StreamEvent::Error {
                            message: format!("Execution timed out after {}s", timeout.as_secs_f64()),
                            node_id: None,
                        })
                        .await;
                    EndStatus::Error
                }
            };

            let _ = tx
                .send(StreamEvent::EndStream {
                    status,
                    total_duration_ms: start_time.elapsed().as_millis() as u64,
                })
                .await;
        });

        rx
    }

    async fn execute_loop(
        input: GraphInput,
        event_tx: EventSender,
        llm_client: Arc<dyn ChatClient>,
        tools: Arc<ToolRegistry>,
        config: GraphConfig,
        persistence: Option<Arc<dyn PersistenceClient>>,
        artifact_model: String,
    ) -> Result<EndStatus> {
        let mut state = GraphState::from_input(input);

        event_tx
            .send(StreamEvent::InitStream {
                run_id: state.run_id.clone(),
                chat_id: state.chat_id.to_string(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            })
            .await?;

        let llm_node = LLMNode::new(Arc::clone(&llm_client), Arc::clone(&tools));
        let tool_node = ToolNode::new(tools, llm_client, artifact_model, persistence.clone());
        let router = SimpleRouter;

        if state.user_id.is_none() {
            if let Some(persist) = &persistence {
                state.user_id = Self::chat_owner(persist.as_ref(), state.chat_id).await;
            }
        }

        // An assistant turn that calls tools is held back until its results
        // exist, so a run cut off mid-tool never stores unanswered calls.
        let mut held_back: Vec<GraphOutput> = Vec::new();
        let mut current_node = NodeType::LLM;

        let status = loop {
            // Guardrail: LLM calls per run
            if current_node == NodeType::LLM && state.steps >= config.max_steps {
                warn!(run_id = %state.run_id, max_steps = config.max_steps, "Step limit reached");
                break EndStatus::StepLimit;
            }

            let node_start = Instant::now();
            match current_node {
                NodeType::LLM => {
                    state.steps += 1;
                    llm_node.execute(&mut state, event_tx.clone()).await?;
                }
                NodeType::Tool => {
                    tool_node.execute(&mut state, event_tx.clone()).await?;
                }
            }

            debug!(
                node = ?current_node,
                duration_ms = node_start.elapsed().as_millis() as u64,
                "Node finished"
            );

            if let Some(persist) = &persistence {
                let outputs = state.last_outputs.clone().unwrap_or_default();
                if current_node == NodeType::LLM && state.has_pending_tool_calls() {
                    held_back = outputs;
                } else {
                    let mut batch = std::mem::take(&mut held_back);
                    batch.extend(outputs);
                    Self::persist_outputs(persist.as_ref(), &state, &batch).await;
                }
            }

            match router.next(&state, current_node) {
                NextNode::End => break EndStatus::Success,
                NextNode::LLM => current_node = NodeType::LLM,
                NextNode::Tool => current_node = NodeType::Tool,
            }
        };

        info!(run_id = %state.run_id, steps = state.steps, status = status.as_str(), "Run finished");
        Ok(status)
    }

    async fn chat_owner(persist: &dyn PersistenceClient, chat_id: uuid::Uuid) -> Option<String> {
        match persist.get_chat(chat_id).await {
            Ok(Some(chat)) => Some(chat.user_id),
            Ok(None) => {
                warn!(chat_id = %chat_id, "Chat not found, transcript will not be saved");
                None
            }
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Could not load chat owner");
                None
            }
        }
    }

    /// Save outputs in order; failures are logged only
    async fn persist_outputs(persist: &dyn PersistenceClient, state: &GraphState, outputs: &[GraphOutput]) {
        let Some(user_id) = state.user_id.as_deref() else {
            debug!(chat_id = %state.chat_id, "No owner for run, skipping persistence");
            return;
        };

        for output in outputs {
            for db_msg in Self::convert_output_to_db(output, state.chat_id, user_id) {
                if let Err(e) = persist.save_message(db_msg).await {
                    error!("Failed to save output to database: {}", e);
                }
            }
        }
    }

    /// One row per reasoning block, text, tool call and tool result
    fn convert_output_to_db(output: &GraphOutput, chat_id: uuid::Uuid, user_id: &str) -> Vec<DBMessage> {
        let base = || DBMessage {
            chat_id,
            user_id: user_id.to_string(),
            role: MessageRole::Assistant,
            ..Default::default()
        };

        match output {
            GraphOutput::Reasoning { content, .. } => vec![DBMessage {
                message_type: MessageType::Reasoning,
                content: content.clone(),
                ..base()
            }],
            GraphOutput::Message { content, tool_calls, .. } => {
                let mut rows = Vec::new();
                if !content.is_empty() {
                    rows.push(DBMessage {
                        message_type: MessageType::Message,
                        content: content.clone(),
                        ..base()
                    });
                }
                for call in tool_calls.iter().flatten() {
                    rows.push(DBMessage {
                        message_type: MessageType::ToolCall,
                        tool_call_id: Some(call.id.clone()),
                        tool_name: Some(call.function.name.clone()),
                        arguments: call.arguments_value().ok(),
                        ..base()
                    });
                }
                rows
            }
            GraphOutput::ToolResult {
                tool_call_id,
                tool_name,
                content,
                duration_ms,
                ..
            } => vec![DBMessage {
                message_type: MessageType::ToolResult,
                content: content.clone(),
                tool_call_id: Some(tool_call_id.clone()),
                tool_name: Some(tool_name.clone()),
                duration_ms: Some(*duration_ms),
                ..base()
            }],
        }
    }
}
