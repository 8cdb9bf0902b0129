use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::context::ToolContext;
use crate::handler::ToolHandler;

pub const OPEN_METEO_API_BASE: &str = "https://api.open-meteo.com/v1";

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    latitude: f64,
    longitude: f64,
}

/// Current conditions and forecast from Open-Meteo
pub struct WeatherTool {
    http_client: reqwest::Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn forecast(&self, latitude: f64, longitude: f64) -> Result<Value> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            bail!("Coordinates out of range: ({}, {})", latitude, longitude);
        }

        let url = format!("{}/forecast", self.base_url);
        debug!(latitude, longitude, "Fetching weather");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", "temperature_2m".to_string()),
                ("hourly", "temperature_2m".to_string()),
                ("daily", "sunrise,sunset".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .context("Weather request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Weather API error ({}): {}", status, body);
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse weather response")
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new(OPEN_METEO_API_BASE)
    }
}

#[async_trait]
impl ToolHandler for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather at a location"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "latitude": { "type": "number" },
                "longitude": { "type": "number" }
            },
            "required": ["latitude", "longitude"]
        })
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value> {
        let args: WeatherArgs =
            serde_json::from_value(arguments).context("get_weather expects latitude and longitude")?;
        self.forecast(args.latitude, args.longitude).await
    }
}
