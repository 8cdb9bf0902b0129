use anyhow::{anyhow, Context, Result};
use parley_llm::Tool;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::context::ToolContext;
use crate::handler::ToolHandler;

/// Name-indexed set of tool handlers
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn ToolHandler>>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry with the built-in chat tools
    pub async fn with_default_tools(weather_base_url: &str) -> Self {
        let registry = Self::new();
        registry
            .register(Arc::new(crate::weather::WeatherTool::new(weather_base_url)))
            .await;
        registry
            .register(Arc::new(crate::documents::CreateDocumentTool))
            .await;
        registry
            .register(Arc::new(crate::documents::UpdateDocumentTool))
            .await;
        registry
            .register(Arc::new(crate::documents::RequestSuggestionsTool))
            .await;
        registry
    }

    /// Register a handler, replacing any handler with the same name
    pub async fn register(&self, handler: Arc<dyn ToolHandler>) {
        let name = handler.name().to_string();
        self.tools.write().await.insert(name, handler);
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tool schemas in the gateway's format, sorted by name
    pub async fn get_llm_tools(&self) -> Vec<Tool> {
        let tools = self.tools.read().await;
        let mut defs: Vec<Tool> = tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name().cmp(b.name()));
        defs
    }

    /// Execute a tool call with its raw JSON argument string.
    ///
    /// Unknown tools, malformed arguments and handler failures are all
    /// returned as errors; the caller decides how to surface them.
    pub async fn execute_tool(&self, name: &str, arguments: &str, ctx: &ToolContext) -> Result<String> {
        let handler = self
            .tools
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("Tool '{}' not found", name))?;

        let args: Value = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments)
                .with_context(|| format!("Invalid JSON arguments for tool '{}'", name))?
        };

        debug!(tool = name, "Executing tool");
        let output = handler.call(args, ctx).await?;

        Ok(match output {
            Value::String(s) => s,
            other => serde_json::to_string(&other)?,
        })
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
