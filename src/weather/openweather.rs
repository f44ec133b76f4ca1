//! OpenWeatherMap client: direct geocoding and current weather.
//!
//! Both endpoints take the API key per call so the credential stays owned by
//! configuration. Transport errors are stripped of their URL before they are
//! surfaced, since the URL carries the key.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{CurrentWeather, WeatherError, WeatherSource};
use crate::config::WeatherConfig;
use crate::geo::{GeoRecord, Geocoder, ResolutionError};

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    geo_url: String,
    weather_url: String,
    units: String,
    lang: String,
}

#[derive(Deserialize)]
struct WeatherResponse {
    main: WeatherMain,
    #[serde(default)]
    weather: Vec<WeatherCondition>,
}

#[derive(Deserialize)]
struct WeatherMain {
    temp: f64,
}

#[derive(Deserialize)]
struct WeatherCondition {
    description: String,
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            geo_url: config.geo_url.clone(),
            weather_url: config.weather_url.clone(),
            units: config.units.clone(),
            lang: config.lang.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for OpenWeatherClient {
    async fn geocode(&self, city: &str, api_key: &str) -> Result<Vec<GeoRecord>, ResolutionError> {
        let response = self
            .client
            .get(&self.geo_url)
            .query(&[("q", city), ("limit", "1"), ("appid", api_key)])
            .send()
            .await
            .map_err(geocode_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::Upstream(format!("geocoding returned HTTP {status}")));
        }

        response
            .json::<Vec<GeoRecord>>()
            .await
            .map_err(geocode_transport_error)
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn current(&self, at: GeoRecord, api_key: &str) -> Result<CurrentWeather, WeatherError> {
        let lat = at.latitude.to_string();
        let lon = at.longitude.to_string();
        let response = self
            .client
            .get(&self.weather_url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", api_key),
                ("units", self.units.as_str()),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .map_err(weather_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Upstream(format!("weather returned HTTP {status}")));
        }

        let body: WeatherResponse = response
            .json()
            .await
            .map_err(weather_transport_error)?;

        let condition = body
            .weather
            .into_iter()
            .next()
            .ok_or(WeatherError::NoConditions)?;

        Ok(CurrentWeather {
            temperature: body.main.temp,
            description: condition.description,
        })
    }
}

/// Maps send and body-read failures alike; the client timeout can fire in
/// either phase.
fn geocode_transport_error(e: reqwest::Error) -> ResolutionError {
    if e.is_timeout() {
        ResolutionError::Timeout
    } else if e.is_decode() {
        ResolutionError::Upstream(format!("invalid geocoding response: {}", e.without_url()))
    } else {
        ResolutionError::Upstream(e.without_url().to_string())
    }
}

fn weather_transport_error(e: reqwest::Error) -> WeatherError {
    if e.is_timeout() {
        WeatherError::Timeout
    } else if e.is_decode() {
        WeatherError::Upstream(format!("invalid weather response: {}", e.without_url()))
    } else {
        WeatherError::Upstream(e.without_url().to_string())
    }
}
