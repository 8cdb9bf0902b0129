use anyhow::Result;
use parley_context::{ContextStrategy, DefaultContextStrategy};
use parley_graph::{Graph, GraphConfig};
use parley_llm::ChatClient;
use parley_persist::PersistenceClient;
use parley_tools::ToolRegistry;
use std::sync::Arc;

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// Everything is behind `Arc`; the graph is stateless and built once at
/// startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: Arc<dyn PersistenceClient>,
    pub llm_client: Arc<dyn ChatClient>,
    pub graph: Arc<Graph>,
    pub context_strategy: Arc<dyn ContextStrategy>,
}

impl AppState {
    pub fn new(
        config: Config,
        persist: Arc<dyn PersistenceClient>,
        llm_client: Arc<dyn ChatClient>,
        tools: Arc<ToolRegistry>,
    ) -> Result<Self> {
        let graph_config = GraphConfig::new()
            .with_max_steps(config.llm.max_steps)
            .with_timeout(config.llm.execution_timeout());

        let graph = Graph::builder()
            .llm_client(Arc::clone(&llm_client))
            .tools(tools)
            .config(graph_config)
            .with_persistence(Arc::clone(&persist))
            .artifact_model(config.llm.artifact_model.clone())
            .build()?;

        let context_strategy = DefaultContextStrategy::new(config.llm.context_max_tokens)?;

        Ok(Self {
            config: Arc::new(config),
            persist,
            llm_client,
            graph: Arc::new(graph),
            context_strategy: Arc::new(context_strategy),
        })
    }
}
