use anyhow::Result;
use async_trait::async_trait;
use parley_llm::Message;
use parley_persist::PersistenceClient;
use uuid::Uuid;

/// Result of context retrieval
#[derive(Debug, Clone)]
pub struct ContextWindow {
    pub system_prompt: String,
    pub messages: Vec<Message>,
}

impl ContextWindow {
    /// System prompt followed by the history, ready for the gateway
    pub fn into_messages(self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        out.push(Message::system(self.system_prompt));
        out.extend(self.messages);
        out
    }
}

/// Strategy for building the context window from conversation history
#[async_trait]
pub trait ContextStrategy: Send + Sync {
    async fn get_context_window(
        &self,
        chat_id: Uuid,
        system_prompt: String,
        persist_client: &dyn PersistenceClient,
    ) -> Result<ContextWindow>;
}
