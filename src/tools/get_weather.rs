//! `get_weather` tool: city name → one-line weather summary.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::Tool;
use crate::geo::{GeoResolver, ResolutionError};
use crate::weather::{WeatherError, WeatherSource};

pub const MISSING_KEY_REPLY: &str = "OpenWeatherMap API key is missing. The user must set the key and restart the application before trying to ask for the weather again.";

pub const FAILURE_REPLY: &str = "Error during weather retrieval.";

/// Parameters for the `get_weather` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetWeatherParams {
    /// City to report on, e.g. "Sofia".
    #[schemars(description = "Name of the city to get the current weather for, e.g. 'Sofia'")]
    pub city: String,
}

pub struct WeatherTool {
    resolver: Arc<GeoResolver>,
    source: Arc<dyn WeatherSource>,
    api_key: Option<String>,
}

impl WeatherTool {
    pub fn new(
        resolver: Arc<GeoResolver>,
        source: Arc<dyn WeatherSource>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            resolver,
            source,
            api_key,
        }
    }

    /// Current weather for `city` as text. Never fails: errors become a fixed
    /// reply and the cause goes to the log.
    pub async fn get_weather(&self, city: &str) -> String {
        let city = city.trim();
        match self.lookup(city).await {
            Ok(summary) => summary,
            Err(WeatherError::Resolution(ResolutionError::MissingCredential)) => {
                MISSING_KEY_REPLY.to_string()
            }
            Err(e) => {
                tracing::warn!(city, error = %e, "failed to get weather");
                FAILURE_REPLY.to_string()
            }
        }
    }

    async fn lookup(&self, city: &str) -> Result<String, WeatherError> {
        let coords = self.resolver.resolve(city).await?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ResolutionError::MissingCredential)?;
        let weather = self.source.current(coords, api_key).await?;
        Ok(format!(
            "The weather in {city}: {}°C, {}.",
            weather.temperature, weather.description
        ))
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a city."
    }

    fn parameters(&self) -> Value {
        let mut schema = schemars::schema_for!(GetWeatherParams);
        schema.remove("$schema");
        schema.to_value()
    }

    async fn call(&self, arguments: Value) -> String {
        match serde_json::from_value::<GetWeatherParams>(arguments) {
            Ok(params) => self.get_weather(&params.city).await,
            Err(e) => {
                tracing::warn!(error = %e, "invalid get_weather arguments");
                format!("Invalid arguments for get_weather: {e}")
            }
        }
    }
}
