use config::{Config as ConfigLoader, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub llm: LlmSettings,
    pub weather: WeatherConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub openrouter_api_key: String,
    #[serde(default)]
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_true() -> bool {
    true
}

/// Gateway and loop settings
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub default_model: String,
    /// Models the client may pick from; anything else is rejected
    pub models: Vec<ChatModel>,
    pub title_model: String,
    pub artifact_model: String,
    pub max_steps: usize,
    pub execution_timeout_secs: u64,
    /// Token budget for the history sent with each turn
    pub context_max_tokens: usize,
    #[serde(default)]
    pub temperature: Option<f32>,
    pub base_url: String,
    #[serde(default)]
    pub referer: Option<String>,
    #[serde(default)]
    pub app_title: Option<String>,
}

impl LlmSettings {
    pub fn find_model(&self, id: &str) -> Option<&ChatModel> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Reasoning models stream their thinking and run without tools
    #[serde(default)]
    pub reasoning: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// User messages allowed per rolling 24 hours
    pub max_messages_per_day: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `PARLEY_`-prefixed environment variables, `__` between section and
    ///    key (`PARLEY_LLM__MAX_STEPS=8`, `PARLEY_SERVER__PORT=9000`)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("PARLEY")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.origins")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Secrets (not in TOML)
        cfg.openrouter_api_key = std::env::var("OPENROUTER_API_KEY").map_err(|_| {
            ConfigError::Message("OPENROUTER_API_KEY environment variable is required".to_string())
        })?;
        cfg.database_url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());

        cfg.validate()?;
        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let cfg: Config = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse an inline TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let cfg: Config = ConfigLoader::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.find_model(&self.llm.default_model).is_none() {
            return Err(ConfigError::Message(format!(
                "llm.default_model '{}' is not listed in llm.models",
                self.llm.default_model
            )));
        }
        if self.llm.max_steps == 0 {
            return Err(ConfigError::Message("llm.max_steps must be at least 1".to_string()));
        }
        Ok(())
    }
}
