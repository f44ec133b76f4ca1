pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;

use crate::config::OllamaConfig;

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Open (or create) the memory database at the given path, with sqlite-vec
/// loaded, schema initialized, and the embedding settings checked against
/// what the database was created with.
pub fn open_database(path: impl AsRef<Path>, embedding: &OllamaConfig) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    load_sqlite_vec();

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_millis(5000))?;

    prepare(&conn, embedding)?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with the same setup as [`open_database`].
pub fn open_memory_database(embedding: &OllamaConfig) -> Result<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    prepare(&conn, embedding)?;
    Ok(conn)
}

fn prepare(conn: &Connection, embedding: &OllamaConfig) -> Result<()> {
    schema::init_schema(conn, embedding.embedding_dim).context("failed to initialize schema")?;
    migrations::run_migrations(conn).context("failed to run migrations")?;
    migrations::init_embedding_model(conn, &embedding.embedding_model)?;

    ensure_embedding_dim(conn, embedding.embedding_dim)?;

    if let Some(stored_model) = migrations::get_embedding_model(conn)? {
        if stored_model != embedding.embedding_model {
            tracing::warn!(
                stored = %stored_model,
                configured = %embedding.embedding_model,
                "embedding model changed; similarity search over old records will degrade"
            );
        }
    }

    Ok(())
}

/// Fail unless vectors of `dim` dimensions fit the store's vec0 table.
pub fn ensure_embedding_dim(conn: &Connection, dim: usize) -> Result<()> {
    if let Some(stored_dim) = migrations::get_embedding_dim(conn)? {
        anyhow::ensure!(
            stored_dim == dim,
            "database vectors have {stored_dim} dimensions but the embedder produces {dim}; \
             point storage.db_path at a new file or restore the old embedding_dim"
        );
    }
    Ok(())
}

/// Result of [`check_database_health`].
#[derive(Debug)]
pub struct HealthReport {
    pub schema_version: u32,
    pub sqlite_vec_version: String,
    pub embedding_model: Option<String>,
    pub embedding_dim: Option<usize>,
    pub record_count: i64,
    pub vector_count: i64,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

/// Collect version info, row counts and the SQLite integrity check result.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;
    let sqlite_vec_version: String = conn.query_row("SELECT vec_version()", [], |r| r.get(0))?;
    let record_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM memory_records", [], |r| r.get(0))?;
    let vector_count: i64 = conn.query_row("SELECT COUNT(*) FROM memory_vec", [], |r| r.get(0))?;
    let integrity: String = conn.query_row("PRAGMA integrity_check", [], |r| r.get(0))?;

    Ok(HealthReport {
        schema_version,
        sqlite_vec_version,
        embedding_model: migrations::get_embedding_model(conn)?,
        embedding_dim: migrations::get_embedding_dim(conn)?,
        record_count,
        vector_count,
        integrity_ok: integrity == "ok",
        integrity_details: integrity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_embedding() -> OllamaConfig {
        OllamaConfig {
            embedding_dim: 8,
            ..OllamaConfig::default()
        }
    }

    #[test]
    fn memory_database_is_migrated() {
        let conn = open_memory_database(&small_embedding()).unwrap();
        assert_eq!(
            migrations::get_schema_version(&conn).unwrap(),
            migrations::CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn health_check_on_fresh_db() {
        let conn = open_memory_database(&small_embedding()).unwrap();
        let report = check_database_health(&conn).unwrap();
        assert!(report.integrity_ok);
        assert_eq!(report.record_count, 0);
        assert_eq!(report.vector_count, 0);
        assert_eq!(report.embedding_dim, Some(8));
        assert_eq!(report.embedding_model.as_deref(), Some("mistral"));
    }

    #[test]
    fn embedder_dimension_must_match_store() {
        let conn = open_memory_database(&small_embedding()).unwrap();
        ensure_embedding_dim(&conn, 8).unwrap();

        let err = ensure_embedding_dim(&conn, 16).unwrap_err();
        assert!(err.to_string().contains("8 dimensions"), "{err}");
    }
}
