use std::sync::Arc;

use parley_api::{build_router, config::Config, init_logging, state::AppState};
use parley_llm::{ChatClient, OpenRouterClient};
use parley_persist::PersistenceBuilder;
use parley_tools::ToolRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Parley API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let llm_client: Arc<dyn ChatClient> = Arc::new(
        OpenRouterClient::with_app_info(
            config.openrouter_api_key.clone(),
            config.llm.referer.clone(),
            config.llm.app_title.clone(),
        )?
        .with_base_url(config.llm.base_url.clone()),
    );

    let tools = Arc::new(ToolRegistry::with_default_tools(&config.weather.base_url).await);
    tracing::info!(tools = ?tools.names().await, "Tools registered");

    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL not set, using the in-memory store");
    }
    let persist = PersistenceBuilder::new()
        .database_url(config.database_url.clone())
        .max_connections(config.database.max_connections)
        .run_migrations(config.database.run_migrations)
        .build()
        .await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, persist, llm_client, tools)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    tracing::info!("API docs: http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
