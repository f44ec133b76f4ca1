//! CLI `geo` commands: resolve a city through the cache tiers, list the
//! persisted coordinates.

use anyhow::{Context, Result};

use crate::app::App;
use crate::config::RagbotConfig;
use crate::geo::GeoRecord;

/// Resolve `city` and print the coordinates and the tier that answered.
pub async fn resolve(config: RagbotConfig, city: &str) -> Result<()> {
    let app = App::build(config)?;
    let city = city.trim();

    let (record, tier) = app
        .resolver
        .resolve_with_tier(city)
        .await
        .with_context(|| format!("could not resolve {city:?}"))?;

    println!("{city}: {record} (from {tier})");
    Ok(())
}

/// Print persisted geo records, optionally only those saved for `city`.
pub async fn list(config: RagbotConfig, city: Option<&str>) -> Result<()> {
    let app = App::build(config)?;
    let collection = &app.config.memory.collection;
    let records = match city.map(str::trim) {
        Some(city) => app.memory.records_for_key(collection, city).await?,
        None => app.memory.list(collection).await?,
    };

    if records.is_empty() {
        match city {
            Some(city) => println!("No cached coordinates for {city:?} in {collection}."),
            None => println!("No cached coordinates in {collection}."),
        }
        return Ok(());
    }

    println!("{} record(s) in {collection}\n", records.len());
    for record in records {
        let coords = serde_json::from_str::<GeoRecord>(&record.text)
            .map(|r| r.to_string())
            .unwrap_or_else(|_| format!("(unreadable: {})", record.text));
        println!("  {:<24} {:<22} {}", record.key, coords, record.created_at);
    }

    Ok(())
}
