//! Write path for the vector memory store.
//!
//! [`save_record`] inserts the payload row and its embedding in one
//! transaction. Records are never updated or deleted.

use anyhow::Result;
use rusqlite::{params, Connection, Transaction};

use super::embedding_to_bytes;

/// Insert a record and its embedding. Returns the new row id.
pub fn save_record(
    conn: &mut Connection,
    collection: &str,
    key: &str,
    text: &str,
    embedding: &[f32],
) -> Result<String> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let tx = conn.transaction()?;
    insert_record(&tx, &id, collection, key, text, &now)?;
    insert_vec(&tx, &id, embedding)?;
    tx.commit()?;

    tracing::debug!(id = %id, collection, key, "memory record saved");
    Ok(id)
}

fn insert_record(
    tx: &Transaction,
    id: &str,
    collection: &str,
    key: &str,
    text: &str,
    created_at: &str,
) -> Result<()> {
    tx.execute(
        "INSERT INTO memory_records (id, collection, key, text, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, collection, key, text, created_at],
    )?;
    Ok(())
}

fn insert_vec(tx: &Transaction, id: &str, embedding: &[f32]) -> Result<()> {
    tx.execute(
        "INSERT INTO memory_vec (id, embedding) VALUES (?1, ?2)",
        params![id, embedding_to_bytes(embedding)],
    )?;
    Ok(())
}
