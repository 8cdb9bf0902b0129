use chrono::{DateTime, Utc};
use parley_llm::{Content, Message, ToolCall};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::PersistError;

/// Storage-agnostic transcript row
///
/// One row per logical piece of an assistant turn: reasoning, text, each tool
/// call and each tool result are stored separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DBMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub user_id: String,
    pub role: MessageRole,
    pub message_type: MessageType,
    pub content: String,
    pub tool_call_id: Option<String>,
    pub tool_name: Option<String>,
    pub arguments: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub duration_ms: Option<u64>,
}

impl Default for DBMessage {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id: Uuid::nil(),
            user_id: String::new(),
            role: MessageRole::Assistant,
            message_type: MessageType::Message,
            content: String::new(),
            tool_call_id: None,
            tool_name: None,
            arguments: None,
            created_at: Utc::now(),
            duration_ms: None,
        }
    }
}

impl DBMessage {
    pub fn user(chat_id: Uuid, user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            user_id: user_id.into(),
            role: MessageRole::User,
            content: content.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl FromStr for MessageRole {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(PersistError::InvalidData(format!("message role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Message,
    Reasoning,
    ToolCall,
    ToolResult,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Reasoning => "reasoning",
            Self::ToolCall => "tool_call",
            Self::ToolResult => "tool_result",
        }
    }
}

impl FromStr for MessageType {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "reasoning" => Ok(Self::Reasoning),
            "tool_call" => Ok(Self::ToolCall),
            "tool_result" => Ok(Self::ToolResult),
            other => Err(PersistError::InvalidData(format!("message type '{}'", other))),
        }
    }
}

// DBMessage -> parley_llm::Message
impl TryFrom<DBMessage> for Message {
    type Error = anyhow::Error;

    fn try_from(msg: DBMessage) -> Result<Self, Self::Error> {
        match (msg.role, msg.message_type) {
            (MessageRole::User, MessageType::Message) => Ok(Message::human(msg.content)),
            (MessageRole::Assistant, MessageType::Message) => Ok(Message::ai(msg.content)),
            (MessageRole::Assistant, MessageType::ToolCall) => {
                match (msg.tool_call_id, msg.tool_name) {
                    (Some(id), Some(name)) => {
                        let arguments = match msg.arguments {
                            Some(value) => serde_json::to_string(&value)?,
                            None => "{}".to_string(),
                        };
                        Ok(Message::ai_with_tools(vec![ToolCall::new(id, name, arguments)]))
                    }
                    _ => Err(anyhow::anyhow!("Invalid tool call message: missing id or name")),
                }
            }
            (_, MessageType::ToolResult) => match msg.tool_call_id {
                Some(tool_call_id) => Ok(Message::Tool {
                    tool_call_id,
                    content: Content::text(msg.content),
                }),
                None => Err(anyhow::anyhow!("Invalid tool result message: missing tool_call_id")),
            },
            (_, MessageType::Reasoning) => Err(anyhow::anyhow!(
                "Reasoning messages are not converted to LLM messages"
            )),
            _ => Err(anyhow::anyhow!("Invalid message role/type combination")),
        }
    }
}

/// Rebuild an LLM transcript from stored rows.
///
/// Consecutive `tool_call` rows belong to one assistant turn and are merged
/// back into a single assistant message so the gateway sees every call
/// followed by its results. Reasoning rows are dropped.
pub fn to_llm_messages(rows: Vec<DBMessage>) -> Vec<Message> {
    let mut out: Vec<Message> = Vec::with_capacity(rows.len());

    for row in rows {
        let is_tool_call = row.message_type == MessageType::ToolCall;
        let converted = match Message::try_from(row) {
            Ok(m) => m,
            Err(e) => {
                tracing::trace!("Skipping stored message: {}", e);
                continue;
            }
        };

        if is_tool_call {
            if let Some(Message::AI {
                content: None,
                tool_calls: Some(prev_calls),
            }) = out.last_mut()
            {
                if let Message::AI {
                    tool_calls: Some(calls),
                    ..
                } = converted
                {
                    prev_calls.extend(calls);
                    continue;
                }
            }
        }

        out.push(converted);
    }

    answer_unanswered_calls(out)
}

const INTERRUPTED_RESULT: &str = "Tool execution was interrupted";

/// Give every tool call without a stored result a stub error result, placed
/// after the results that do exist. Gateways reject a tool-calling turn whose
/// calls are not all answered.
fn answer_unanswered_calls(messages: Vec<Message>) -> Vec<Message> {
    fn flush(out: &mut Vec<Message>, pending: &mut Vec<String>) {
        for id in pending.drain(..) {
            tracing::debug!(tool_call_id = %id, "Stubbing unanswered tool call");
            out.push(Message::tool_result(id, INTERRUPTED_RESULT));
        }
    }

    let mut out = Vec::with_capacity(messages.len());
    let mut pending: Vec<String> = Vec::new();

    for message in messages {
        match &message {
            Message::Tool { tool_call_id, .. } => pending.retain(|id| id != tool_call_id),
            _ => {
                flush(&mut out, &mut pending);
                if let Message::AI {
                    tool_calls: Some(calls),
                    ..
                } = &message
                {
                    pending = calls.iter().map(|c| c.id.clone()).collect();
                }
            }
        }
        out.push(message);
    }
    flush(&mut out, &mut pending);

    out
}
