use crate::config::LLMConfig;
use crate::output::GraphOutput;
use parley_llm::{Message, ToolCall};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GraphState {
    pub chat_id: Uuid,
    pub run_id: String,
    pub user_id: Option<String>,
    pub messages: Vec<Message>,
    pub llm_config: LLMConfig,
    /// LLM calls made so far
    pub steps: usize,
    pub last_outputs: Option<Vec<GraphOutput>>,
}

impl GraphState {
    pub fn new(chat_id: Uuid, run_id: String, messages: Vec<Message>, llm_config: LLMConfig) -> Self {
        Self {
            chat_id,
            run_id,
            user_id: None,
            messages,
            llm_config,
            steps: 0,
            last_outputs: None,
        }
    }

    pub fn from_input(input: GraphInput) -> Self {
        Self {
            chat_id: input.chat_id,
            run_id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            messages: input.messages,
            llm_config: input.llm_config,
            steps: 0,
            last_outputs: None,
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn has_pending_tool_calls(&self) -> bool {
        matches!(
            self.last_message(),
            Some(Message::AI { tool_calls: Some(calls), .. }) if !calls.is_empty()
        )
    }

    pub fn get_pending_tool_calls(&self) -> Vec<ToolCall> {
        match self.last_message() {
            Some(Message::AI { tool_calls: Some(calls), .. }) => calls.clone(),
            _ => Vec::new(),
        }
    }

    pub fn add_tool_result(&mut self, tool_call_id: String, result: String) {
        self.messages.push(Message::Tool {
            tool_call_id,
            content: parley_llm::Content::text(result),
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphInput {
    pub chat_id: Uuid,
    #[serde(default)]
    pub user_id: Option<String>,
    pub messages: Vec<Message>,
    pub llm_config: LLMConfig,
}

impl GraphInput {
    pub fn new(chat_id: Uuid, messages: Vec<Message>, llm_config: LLMConfig) -> Self {
        Self {
            chat_id,
            user_id: None,
            messages,
            llm_config,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
