//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use crate::config::RagbotConfig;
use crate::db;
use crate::memory;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &RagbotConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("It is created on the first `ragbot` run.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path, &config.ollama)
        .context("failed to open database (may be corrupt, or embedding_dim changed)")?;

    let report = db::check_database_health(&conn).context("failed to run health check")?;
    let geo_records = memory::search::count_records(&conn, &config.memory.collection)?;

    println!("Ragbot Health Report");
    println!("====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("sqlite-vec:        {}", report.sqlite_vec_version);
    println!();
    println!("Embedding model:");
    println!("  Stored:          {}", report.embedding_model.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {}", config.ollama.embedding_model);
    if let Some(dim) = report.embedding_dim {
        println!("  Dimensions:      {dim}");
    }
    println!();
    println!("Rows:");
    println!("  Records:         {}", report.record_count);
    println!("  Vectors:         {}", report.vector_count);
    println!("  Geo ({}): {geo_records}", config.memory.collection);
    println!();
    println!(
        "OpenWeatherMap key: {}",
        if config.weather.credential().is_some() { "set" } else { "MISSING" }
    );
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
