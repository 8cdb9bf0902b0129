use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parley_llm::Message;
use parley_persist::{to_llm_messages, PersistenceClient};
use parley_types::ContextPolicy;
use tiktoken_rs::{cl100k_base, CoreBPE};
use tracing::debug;
use uuid::Uuid;

use crate::strategy::{ContextStrategy, ContextWindow};

/// Fixed per-message overhead of the chat format (role and separators)
const TOKENS_PER_MESSAGE: usize = 4;

/// Keeps the most recent history that fits a token budget
pub struct DefaultContextStrategy {
    max_tokens: usize,
    policy: ContextPolicy,
    bpe: CoreBPE,
}

impl DefaultContextStrategy {
    pub fn new(max_tokens: usize) -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| anyhow!("Tokenizer error: {}", e))?;
        Ok(Self {
            max_tokens,
            policy: ContextPolicy::default(),
            bpe,
        })
    }

    pub fn with_policy(mut self, policy: ContextPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Count tokens of one message using tiktoken
    pub fn count_tokens(&self, message: &Message) -> usize {
        let mut total = TOKENS_PER_MESSAGE + self.bpe.encode_with_special_tokens(&message.text()).len();
        if let Message::AI { tool_calls: Some(calls), .. } = message {
            for call in calls {
                total += self.bpe.encode_with_special_tokens(&call.function.name).len();
                total += self.bpe.encode_with_special_tokens(&call.function.arguments).len();
            }
        }
        total
    }

    /// Drop the oldest messages until the rest fits `budget`.
    ///
    /// The window always starts at a user turn so it never opens with a
    /// tool result whose call was cut off. The newest message is kept even
    /// when it alone exceeds the budget.
    fn fit_to_budget(&self, mut messages: Vec<Message>, budget: usize) -> Vec<Message> {
        let costs: Vec<usize> = messages.iter().map(|m| self.count_tokens(m)).collect();
        let mut total: usize = costs.iter().sum();

        let mut start = 0;
        while total > budget && start + 1 < messages.len() {
            total -= costs[start];
            start += 1;
        }
        while start + 1 < messages.len() && !matches!(messages[start], Message::Human { .. }) {
            start += 1;
        }

        if start > 0 {
            debug!(dropped = start, kept = messages.len() - start, "Trimmed context window");
        }
        messages.split_off(start)
    }
}

#[async_trait]
impl ContextStrategy for DefaultContextStrategy {
    async fn get_context_window(
        &self,
        chat_id: Uuid,
        system_prompt: String,
        persist_client: &dyn PersistenceClient,
    ) -> Result<ContextWindow> {
        let limit = match self.policy {
            ContextPolicy::LastK { k } => Some(k),
            ContextPolicy::AllMessages => None,
        };
        let rows = persist_client.get_messages(chat_id, limit, None).await?;
        let messages = to_llm_messages(rows);

        let prompt_tokens = self.bpe.encode_with_special_tokens(&system_prompt).len();
        let budget = self.max_tokens.saturating_sub(prompt_tokens);

        Ok(ContextWindow {
            system_prompt,
            messages: self.fit_to_budget(messages, budget),
        })
    }
}
