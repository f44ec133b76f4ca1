//! Current-weather lookup by coordinates.

pub mod openweather;

use async_trait::async_trait;
use thiserror::Error;

use crate::geo::{GeoRecord, ResolutionError};

pub use openweather::OpenWeatherClient;

/// The part of a weather report the tool relays.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    /// In the configured units (°C for `metric`).
    pub temperature: f64,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("weather request timed out")]
    Timeout,
    #[error("weather request failed: {0}")]
    Upstream(String),
    #[error("weather response had no conditions")]
    NoConditions,
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self, at: GeoRecord, api_key: &str) -> Result<CurrentWeather, WeatherError>;
}
