//! City name → coordinates, through a tiered cache.
//!
//! [`GeoResolver`] consults its in-process map, then the vector memory store,
//! then a remote [`Geocoder`], writing results back to the faster tiers.

pub mod resolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use resolver::{GeoResolver, Tier};

/// Coordinates of a resolved city. Serialized as `{"lat": .., "lon": ..}`,
/// which is both the geocoding wire shape and the stored payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl GeoRecord {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for GeoRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Error)]
pub enum ResolutionError {
    /// No API key configured. Fixed by configuration, not by retrying.
    #[error("OpenWeatherMap API key is missing")]
    MissingCredential,
    #[error("no geocoding match for {city:?}")]
    NotFound { city: String },
    #[error("geocoding request timed out")]
    Timeout,
    #[error("geocoding failed: {0}")]
    Upstream(String),
}

/// Remote city-name lookup.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidate coordinates for `city`, best match first. May be empty.
    async fn geocode(&self, city: &str, api_key: &str) -> Result<Vec<GeoRecord>, ResolutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_record_uses_lat_lon_keys() {
        let record = GeoRecord::new(42.7, 23.32);
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json, serde_json::json!({"lat": 42.7, "lon": 23.32}));
    }

    #[test]
    fn geo_record_ignores_extra_geocoding_fields() {
        let json = r#"{"name": "Sofia", "lat": 42.6977, "lon": 23.3219, "country": "BG"}"#;
        let record: GeoRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record, GeoRecord::new(42.6977, 23.3219));
    }
}
