use anyhow::{anyhow, Result};
use parley_llm::ChatClient;
use parley_persist::PersistenceClient;
use parley_types::{ArtifactEvent, StreamEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Channel the loop and its tools push stream events into
pub type EventSender = mpsc::Sender<StreamEvent>;

/// Everything a tool may need while it runs for one request
#[derive(Clone)]
pub struct ToolContext {
    pub chat_id: Uuid,
    pub user_id: Option<String>,
    pub event_tx: EventSender,
    pub persist: Option<Arc<dyn PersistenceClient>>,
    /// Client used for nested generations (documents, suggestions)
    pub llm: Arc<dyn ChatClient>,
    pub artifact_model: String,
}

impl ToolContext {
    pub fn new(
        chat_id: Uuid,
        event_tx: EventSender,
        llm: Arc<dyn ChatClient>,
        artifact_model: impl Into<String>,
    ) -> Self {
        Self {
            chat_id,
            user_id: None,
            event_tx,
            persist: None,
            llm,
            artifact_model: artifact_model.into(),
        }
    }

    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_persistence(mut self, persist: Option<Arc<dyn PersistenceClient>>) -> Self {
        self.persist = persist;
        self
    }

    pub async fn emit(&self, event: StreamEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| anyhow!("Event receiver dropped"))
    }

    pub async fn emit_artifact(&self, event: ArtifactEvent) -> Result<()> {
        self.emit(StreamEvent::Artifact { event }).await
    }

    pub fn require_user(&self) -> Result<&str> {
        self.user_id
            .as_deref()
            .ok_or_else(|| anyhow!("This tool requires an authenticated user"))
    }

    pub fn require_persist(&self) -> Result<&Arc<dyn PersistenceClient>> {
        self.persist
            .as_ref()
            .ok_or_else(|| anyhow!("This tool requires a configured document store"))
    }
}
