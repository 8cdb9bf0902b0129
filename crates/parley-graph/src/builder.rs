use anyhow::{anyhow, Result};
use parley_llm::ChatClient;
use parley_persist::PersistenceClient;
use parley_tools::ToolRegistry;
use parley_types::GraphConfig;
use std::sync::Arc;

use crate::graph::Graph;

/// Builder for constructing a Graph with optional components
pub struct GraphBuilder {
    llm_client: Option<Arc<dyn ChatClient>>,
    tools: Option<Arc<ToolRegistry>>,
    config: GraphConfig,
    persistence: Option<Arc<dyn PersistenceClient>>,
    artifact_model: Option<String>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            llm_client: None,
            tools: None,
            config: GraphConfig::default(),
            persistence: None,
            artifact_model: None,
        }
    }

    pub fn llm_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.llm_client = Some(client);
        self
    }

    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable transcript persistence
    pub fn with_persistence(mut self, client: Arc<dyn PersistenceClient>) -> Self {
        self.persistence = Some(client);
        self
    }

    /// Model for nested document generations; defaults to the chat model
    pub fn artifact_model(mut self, model: impl Into<String>) -> Self {
        self.artifact_model = Some(model.into());
        self
    }

    pub fn build(self) -> Result<Graph> {
        let llm_client = self.llm_client.ok_or_else(|| anyhow!("LLM client is required"))?;
        let tools = self.tools.unwrap_or_else(|| Arc::new(ToolRegistry::new()));

        Ok(Graph::new_with_config(
            llm_client,
            tools,
            self.config,
            self.persistence,
            self.artifact_model.unwrap_or_default(),
        ))
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
