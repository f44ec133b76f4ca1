use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use super::{GeoRecord, Geocoder, ResolutionError};
use crate::memory::SemanticMemory;

/// Which tier answered a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    ProcessCache,
    VectorMemory,
    Remote,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ProcessCache => "process cache",
            Self::VectorMemory => "vector memory",
            Self::Remote => "remote geocoding",
        })
    }
}

type KeyLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Tiered city → coordinates resolver.
///
/// Entries are never evicted or updated. Without in-flight coalescing,
/// concurrent misses for the same city may each call the geocoder and each
/// save a row to the vector store.
pub struct GeoResolver {
    cache: RwLock<HashMap<String, GeoRecord>>,
    memory: SemanticMemory,
    geocoder: Arc<dyn Geocoder>,
    api_key: Option<String>,
    collection: String,
    key_locks: Option<KeyLocks>,
}

impl GeoResolver {
    pub fn new(
        memory: SemanticMemory,
        geocoder: Arc<dyn Geocoder>,
        api_key: Option<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            memory,
            geocoder,
            api_key,
            collection: collection.into(),
            key_locks: None,
        }
    }

    /// Serialize resolutions of the same city so concurrent misses share
    /// one upstream call.
    pub fn with_inflight_coalescing(mut self) -> Self {
        self.key_locks = Some(Mutex::new(HashMap::new()));
        self
    }

    pub async fn resolve(&self, city: &str) -> Result<GeoRecord, ResolutionError> {
        self.resolve_with_tier(city).await.map(|(record, _)| record)
    }

    /// Like [`resolve`](Self::resolve), also reporting the tier that answered.
    pub async fn resolve_with_tier(&self, city: &str) -> Result<(GeoRecord, Tier), ResolutionError> {
        if let Some(record) = self.cached(city) {
            debug!(city, "geo cache hit");
            return Ok((record, Tier::ProcessCache));
        }

        let Some(locks) = &self.key_locks else {
            return self.resolve_uncached(city).await;
        };

        let lock = key_lock(locks, city);
        let result = {
            let _guard = lock.lock().await;
            // Another task may have finished this city while we waited
            match self.cached(city) {
                Some(record) => {
                    debug!(city, "geo cache hit after waiting on in-flight lookup");
                    Ok((record, Tier::ProcessCache))
                }
                None => self.resolve_uncached(city).await,
            }
        };
        drop(lock);
        release_key_lock(locks, city);
        result
    }

    /// Number of cities with a coalesced lookup in progress or queued.
    pub fn in_flight(&self) -> usize {
        self.key_locks
            .as_ref()
            .map_or(0, |locks| locks.lock().unwrap_or_else(PoisonError::into_inner).len())
    }

    async fn resolve_uncached(&self, city: &str) -> Result<(GeoRecord, Tier), ResolutionError> {
        if let Some(record) = self.lookup_memory(city).await {
            self.remember(city, record);
            return Ok((record, Tier::VectorMemory));
        }

        let record = self.lookup_remote(city).await?;
        self.remember(city, record);
        Ok((record, Tier::Remote))
    }

    /// Peek at the process cache without any I/O.
    pub fn cached(&self, city: &str) -> Option<GeoRecord> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(city)
            .copied()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn remember(&self, city: &str, record: GeoRecord) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(city.to_string(), record);
    }

    /// Search the vector store for a record indexed under exactly `city`.
    /// Near matches are skipped; store failures count as a miss.
    async fn lookup_memory(&self, city: &str) -> Option<GeoRecord> {
        debug!(city, collection = %self.collection, "checking vector memory");

        let matches = match self.memory.search(&self.collection, city).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(city, error = %e, "vector memory search failed, falling back to geocoding");
                return None;
            }
        };

        let hit = matches.into_iter().find(|m| m.record.key == city)?;
        match serde_json::from_str::<GeoRecord>(&hit.record.text) {
            Ok(record) => {
                debug!(city, relevance = hit.relevance, "coordinates found in vector memory");
                Some(record)
            }
            Err(e) => {
                warn!(city, id = %hit.record.id, error = %e, "undecodable geo payload in vector memory");
                None
            }
        }
    }

    async fn lookup_remote(&self, city: &str) -> Result<GeoRecord, ResolutionError> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(city, "no OpenWeatherMap API key configured, cannot geocode");
            return Err(ResolutionError::MissingCredential);
        };

        info!(city, "geocoding via remote API");
        let record = self
            .geocoder
            .geocode(city, api_key)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ResolutionError::NotFound {
                city: city.to_string(),
            })?;

        match serde_json::to_string(&record) {
            Ok(payload) => {
                if let Err(e) = self.memory.save(&self.collection, &payload, city).await {
                    warn!(city, error = %e, "failed to persist coordinates to vector memory");
                }
            }
            Err(e) => warn!(city, error = %e, "failed to serialize coordinates"),
        }

        info!(city, %record, "coordinates resolved remotely");
        Ok(record)
    }
}

fn key_lock(locks: &KeyLocks, city: &str) -> Arc<tokio::sync::Mutex<()>> {
    let mut locks = locks.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(city.to_string()).or_default())
}

/// Drop the city's lock once no task holds or waits on it. Clones are only
/// taken under the map lock, so a count of one cannot race upward here.
fn release_key_lock(locks: &KeyLocks, city: &str) {
    let mut locks = locks.lock().unwrap_or_else(PoisonError::into_inner);
    if locks.get(city).is_some_and(|lock| Arc::strong_count(lock) == 1) {
        locks.remove(city);
    }
}
