use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactEvent;

/// Unified event for the orchestration loop
///
/// Carries both the relayed LLM tokens and loop bookkeeping. The HTTP layer
/// maps each variant to one named SSE event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Loop started
    InitStream {
        run_id: String,
        chat_id: String,
        timestamp: i64,
    },

    Reasoning {
        content: String,
    },

    Message {
        content: String,
    },

    /// Model is calling a tool (streamed incrementally)
    ToolCall {
        index: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },

    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: String,
        is_error: bool,
        duration_ms: u64,
    },

    Artifact {
        event: ArtifactEvent,
    },

    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },

    /// One LLM step finished
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },

    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },

    /// Loop finished; always the last event
    EndStream {
        status: EndStatus,
        total_duration_ms: u64,
    },
}

impl StreamEvent {
    /// Wire name of the event, matching the serde tag
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitStream { .. } => "init_stream",
            Self::Reasoning { .. } => "reasoning",
            Self::Message { .. } => "message",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Artifact { .. } => "artifact",
            Self::Usage { .. } => "usage",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
            Self::EndStream { .. } => "end_stream",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndStatus {
    Success,
    StepLimit,
    Error,
}

impl EndStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::StepLimit => "step_limit",
            Self::Error => "error",
        }
    }
}

impl From<parley_llm::StreamEvent> for StreamEvent {
    fn from(event: parley_llm::StreamEvent) -> Self {
        match event {
            parley_llm::StreamEvent::Reasoning { content } => Self::Reasoning { content },
            parley_llm::StreamEvent::Message { content } => Self::Message { content },
            parley_llm::StreamEvent::ToolCall {
                index,
                id,
                name,
                arguments,
            } => Self::ToolCall {
                index,
                id,
                name,
                arguments,
            },
            parley_llm::StreamEvent::Usage { usage } => Self::Usage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
            },
            parley_llm::StreamEvent::Done { finish_reason } => Self::Done { finish_reason },
        }
    }
}
