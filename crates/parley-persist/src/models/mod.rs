mod chat;
mod db_message;
mod document;
mod vote;

pub use chat::{Chat, ChatList, ChatPage, Visibility};
pub use db_message::{to_llm_messages, DBMessage, MessageRole, MessageType};
pub use document::{Document, Suggestion};
pub use vote::Vote;
