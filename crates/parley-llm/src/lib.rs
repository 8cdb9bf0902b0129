pub mod types;
pub mod traits;
pub mod streaming;
pub mod buffer_utils;
pub mod openrouter;

pub use traits::{
    ChatClient,
    ChatRequest, ChatResponse, ChatOptions,
    EventStream,
    TokenUsage,
};

pub use streaming::{ChatChunkParser, StreamEvent};
pub use buffer_utils::{CircularLineBuffer, SseLineParser, parse_sse_stream};
pub use openrouter::{OpenRouterClient, OPENROUTER_API_BASE};
pub use types::{Message, Content, ContentPart, Tool, ToolCall, ToolChoice};
