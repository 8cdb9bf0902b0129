use anyhow::Result;
use async_trait::async_trait;
use parley_llm::Tool;
use serde_json::Value;

use crate::context::ToolContext;

/// A locally executed tool the model can call
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object
    fn parameters(&self) -> Value;

    fn definition(&self) -> Tool {
        Tool::new(self.name(), self.description(), self.parameters())
    }

    /// Run the tool. The returned value is serialized and handed back to the
    /// model as the tool result.
    async fn call(&self, arguments: Value, ctx: &ToolContext) -> Result<Value>;
}
