#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use ragbot::config::{MemoryConfig, OllamaConfig, GEO_COLLECTION};
use ragbot::embedding::{l2_normalize, EmbeddingProvider};
use ragbot::geo::{GeoRecord, GeoResolver, Geocoder, ResolutionError};
use ragbot::memory::SemanticMemory;
use ragbot::weather::{CurrentWeather, WeatherError, WeatherSource};
use rusqlite::Connection;

pub const TEST_DIM: usize = 64;
pub const API_KEY: &str = "test-key";

pub fn test_ollama_config() -> OllamaConfig {
    OllamaConfig {
        embedding_model: "trigram-test".into(),
        embedding_dim: TEST_DIM,
        ..OllamaConfig::default()
    }
}

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Arc<Mutex<Connection>> {
    let conn = ragbot::db::open_memory_database(&test_ollama_config()).unwrap();
    Arc::new(Mutex::new(conn))
}

/// Memory config that returns every candidate, however distant.
pub fn permissive_memory_config() -> MemoryConfig {
    MemoryConfig {
        min_relevance: 0.0,
        ..MemoryConfig::default()
    }
}

pub fn test_memory(db: &Arc<Mutex<Connection>>, config: &MemoryConfig) -> SemanticMemory {
    SemanticMemory::new(db.clone(), Arc::new(TrigramEmbedding), config)
}

/// Count saved rows whose key is exactly `key`.
pub fn rows_for_key(db: &Arc<Mutex<Connection>>, key: &str) -> i64 {
    db.lock()
        .unwrap()
        .query_row(
            "SELECT COUNT(*) FROM memory_records WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .unwrap()
}

/// Deterministic embedding: hashed, case-insensitive character trigrams.
/// Equal strings (ignoring case) embed identically; shared trigrams make
/// spelling variants close.
pub struct TrigramEmbedding;

#[async_trait]
impl EmbeddingProvider for TrigramEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let padded: Vec<char> = format!(" {} ", text.to_lowercase()).chars().collect();
        let mut v = vec![0.0f32; TEST_DIM];
        for window in padded.windows(3) {
            let mut hash: u32 = 2166136261;
            for c in window {
                hash ^= *c as u32;
                hash = hash.wrapping_mul(16777619);
            }
            v[hash as usize % TEST_DIM] += 1.0;
        }
        Ok(l2_normalize(&v))
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }
}

/// Embedding provider whose backend is always down.
pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingProvider for FailingEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        anyhow::bail!("embedding backend unavailable")
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }
}

/// Geocoder with canned answers that counts how often it is called.
#[derive(Default)]
pub struct CountingGeocoder {
    answers: HashMap<String, Vec<GeoRecord>>,
    failure: Option<fn() -> ResolutionError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl CountingGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, city: &str, records: Vec<GeoRecord>) -> Self {
        self.answers.insert(city.to_string(), records);
        self
    }

    pub fn failing_with(mut self, failure: fn() -> ResolutionError) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for CountingGeocoder {
    async fn geocode(&self, city: &str, api_key: &str) -> Result<Vec<GeoRecord>, ResolutionError> {
        assert_eq!(api_key, API_KEY);
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = self.failure {
            return Err(failure());
        }
        Ok(self.answers.get(city).cloned().unwrap_or_default())
    }
}

pub fn sofia() -> GeoRecord {
    GeoRecord::new(42.70, 23.32)
}

/// Resolver over `db` with a geocoder that knows Sofia.
pub fn sofia_resolver(
    db: &Arc<Mutex<Connection>>,
    api_key: Option<&str>,
) -> (GeoResolver, Arc<CountingGeocoder>) {
    let geocoder = Arc::new(CountingGeocoder::new().with_answer("Sofia", vec![sofia()]));
    let resolver = GeoResolver::new(
        test_memory(db, &MemoryConfig::default()),
        geocoder.clone(),
        api_key.map(str::to_string),
        GEO_COLLECTION,
    );
    (resolver, geocoder)
}

/// Weather source that always reports the same conditions.
pub struct FixedWeather(pub Result<CurrentWeather, fn() -> WeatherError>);

#[async_trait]
impl WeatherSource for FixedWeather {
    async fn current(&self, _at: GeoRecord, _api_key: &str) -> Result<CurrentWeather, WeatherError> {
        match &self.0 {
            Ok(weather) => Ok(weather.clone()),
            Err(failure) => Err(failure()),
        }
    }
}
