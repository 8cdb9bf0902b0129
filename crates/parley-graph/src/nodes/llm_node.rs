use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use parley_llm::{ChatClient, ChatOptions, ChatRequest, Content, EventStream, Message, ToolCall, ToolChoice};
use parley_tools::ToolRegistry;
use parley_types::{GraphOutput, GraphState, StreamEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::node::{EventSender, Node, NodeType};

#[derive(Default)]
struct ToolCallBuffer {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

pub struct LLMNode {
    client: Arc<dyn ChatClient>,
    tools: Arc<ToolRegistry>,
}

impl LLMNode {
    pub fn new(client: Arc<dyn ChatClient>, tools: Arc<ToolRegistry>) -> Self {
        Self { client, tools }
    }

    async fn create_stream(&self, state: &GraphState) -> Result<EventStream> {
        let config = &state.llm_config;
        let mut options = ChatOptions::new().include_reasoning(config.include_reasoning);

        if config.tools_enabled {
            let tools = self.tools.get_llm_tools().await;
            if !tools.is_empty() {
                options = options.tools(tools).tool_choice(ToolChoice::auto());
            }
        }
        if let Some(temp) = config.temperature {
            options = options.temperature(temp);
        }
        if let Some(max_tokens) = config.max_tokens {
            options = options.max_tokens(max_tokens);
        }

        info!(
            model = %config.model,
            step = state.steps,
            messages = state.messages.len(),
            "LLM_NODE: creating stream"
        );

        let request = ChatRequest::new(config.model.clone(), state.messages.clone()).with_options(options);
        self.client
            .chat_stream(request)
            .await
            .context("Failed to open model stream")
    }

    /// Forward events to the client while accumulating the step's outputs
    async fn process_stream(&self, mut stream: EventStream, event_tx: &EventSender) -> Result<Vec<GraphOutput>> {
        let mut reasoning_content = String::new();
        let mut message_content = String::new();
        // ordered by index so calls keep the order the model emitted them in
        let mut tool_call_buffers: BTreeMap<u32, ToolCallBuffer> = BTreeMap::new();

        while let Some(event_result) = stream.next().await {
            let llm_event = event_result?;

            event_tx
                .send(StreamEvent::from(llm_event.clone()))
                .await
                .context("Event receiver dropped")?;

            match llm_event {
                parley_llm::StreamEvent::Reasoning { content } => {
                    reasoning_content.push_str(&content);
                }
                parley_llm::StreamEvent::Message { content } => {
                    message_content.push_str(&content);
                }
                parley_llm::StreamEvent::ToolCall { index, id, name, arguments } => {
                    let entry = tool_call_buffers.entry(index).or_default();
                    if let Some(id) = id {
                        entry.id = Some(id);
                    }
                    if let Some(name) = name {
                        entry.name = Some(name);
                    }
                    if let Some(args) = arguments {
                        entry.arguments.push_str(&args);
                    }
                }
                _ => {}
            }
        }

        let mut outputs = Vec::new();

        if !reasoning_content.is_empty() {
            outputs.push(GraphOutput::reasoning(
                format!("rs_{}", uuid::Uuid::new_v4()),
                reasoning_content,
            ));
        }

        let tool_calls: Vec<ToolCall> = tool_call_buffers
            .into_iter()
            .filter_map(|(index, buf)| {
                let name = buf.name?;
                let id = buf.id.unwrap_or_else(|| format!("call_{}", index));
                Some(ToolCall::new(id, name, buf.arguments))
            })
            .collect();

        let id = format!("msg_{}", uuid::Uuid::new_v4());
        if !tool_calls.is_empty() {
            debug!(count = tool_calls.len(), "Model requested tool calls");
            outputs.push(GraphOutput::message_with_tools(id, message_content, tool_calls));
        } else if !message_content.is_empty() {
            outputs.push(GraphOutput::message(id, message_content));
        }

        Ok(outputs)
    }

    /// Append the assistant turn to the transcript. Reasoning stays out of it.
    fn save_outputs(&self, state: &mut GraphState, outputs: &[GraphOutput]) {
        for output in outputs {
            if let GraphOutput::Message { content, tool_calls, .. } = output {
                let content = (!content.is_empty()).then(|| Content::text(content.clone()));
                state.add_message(Message::AI {
                    content,
                    tool_calls: tool_calls.clone(),
                });
            }
        }
    }
}

#[async_trait]
impl Node for LLMNode {
    async fn execute(&self, state: &mut GraphState, event_tx: EventSender) -> Result<()> {
        let stream = self.create_stream(state).await?;
        let outputs = self.process_stream(stream, &event_tx).await?;
        self.save_outputs(state, &outputs);
        state.last_outputs = Some(outputs);
        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::LLM
    }
}
