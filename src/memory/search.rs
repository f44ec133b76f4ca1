//! Read path for the vector memory store.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::types::{MemoryMatch, MemoryRecord};
use super::{embedding_to_bytes, l2_to_relevance};

/// Candidates pulled from the vec0 index per requested result. The index is
/// shared by all collections, so hits from other collections are dropped
/// after the KNN step.
const CANDIDATE_FACTOR: usize = 4;

/// Nearest-neighbor search within one collection.
///
/// Returns at most `limit` matches with relevance ≥ `min_relevance`, most
/// similar first.
pub fn search_records(
    conn: &Connection,
    collection: &str,
    query_embedding: &[f32],
    limit: usize,
    min_relevance: f64,
) -> Result<Vec<MemoryMatch>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let candidates = vector_search(conn, query_embedding, limit * CANDIDATE_FACTOR)?;

    let mut matches = Vec::with_capacity(limit);
    for (id, distance) in candidates {
        let relevance = l2_to_relevance(distance);
        // Ordered by distance, nothing further down can qualify
        if relevance < min_relevance {
            break;
        }
        let Some(record) = fetch_record(conn, &id)? else {
            continue;
        };
        if record.collection != collection {
            continue;
        }
        matches.push(MemoryMatch { record, relevance });
        if matches.len() == limit {
            break;
        }
    }

    Ok(matches)
}

/// All records of a collection, oldest first.
pub fn list_records(conn: &Connection, collection: &str) -> Result<Vec<MemoryRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, collection, key, text, created_at FROM memory_records \
         WHERE collection = ?1 ORDER BY rowid",
    )?;
    let records = stmt
        .query_map(params![collection], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Records saved under exactly `key`, oldest first. Served by the
/// `(collection, key)` index.
pub fn records_for_key(conn: &Connection, collection: &str, key: &str) -> Result<Vec<MemoryRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, collection, key, text, created_at FROM memory_records \
         WHERE collection = ?1 AND key = ?2 ORDER BY rowid",
    )?;
    let records = stmt
        .query_map(params![collection, key], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Number of records in a collection.
pub fn count_records(conn: &Connection, collection: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memory_records WHERE collection = ?1",
        params![collection],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Vector KNN search via sqlite-vec. Returns (id, L2 distance) pairs.
fn vector_search(conn: &Connection, embedding: &[f32], limit: usize) -> Result<Vec<(String, f64)>> {
    let embedding_bytes = embedding_to_bytes(embedding);
    let mut stmt = conn.prepare(
        "SELECT id, distance FROM memory_vec \
         WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
    )?;
    let results = stmt
        .query_map(params![embedding_bytes, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

fn fetch_record(conn: &Connection, id: &str) -> Result<Option<MemoryRecord>> {
    let record = conn
        .query_row(
            "SELECT id, collection, key, text, created_at FROM memory_records WHERE id = ?1",
            params![id],
            row_to_record,
        )
        .optional()?;
    Ok(record)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryRecord> {
    Ok(MemoryRecord {
        id: row.get(0)?,
        collection: row.get(1)?,
        key: row.get(2)?,
        text: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OllamaConfig;
    use crate::memory::store::save_record;

    fn test_db() -> Connection {
        crate::db::open_memory_database(&OllamaConfig {
            embedding_dim: 4,
            ..OllamaConfig::default()
        })
        .unwrap()
    }

    fn unit(i: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; 4];
        v[i] = 1.0;
        v
    }

    /// Close to `unit(0)` (cosine ~0.995).
    fn near_first() -> Vec<f32> {
        crate::embedding::l2_normalize(&[1.0, 0.1, 0.0, 0.0])
    }

    #[test]
    fn nearest_record_comes_first() {
        let mut conn = test_db();
        save_record(&mut conn, "geo", "Sofia", "a", &unit(0)).unwrap();
        save_record(&mut conn, "geo", "Plovdiv", "b", &unit(1)).unwrap();

        let matches = search_records(&conn, "geo", &near_first(), 5, 0.0).unwrap();
        assert_eq!(matches[0].record.key, "Sofia");
        assert!(matches[0].relevance > 0.99);
        assert!(matches[0].relevance >= matches[1].relevance);
    }

    #[test]
    fn min_relevance_drops_distant_records() {
        let mut conn = test_db();
        save_record(&mut conn, "geo", "Sofia", "a", &unit(0)).unwrap();
        save_record(&mut conn, "geo", "Plovdiv", "b", &unit(1)).unwrap();

        let matches = search_records(&conn, "geo", &unit(0), 5, 0.7).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.key, "Sofia");
    }

    #[test]
    fn other_collections_are_ignored() {
        let mut conn = test_db();
        save_record(&mut conn, "notes", "Sofia", "x", &unit(0)).unwrap();
        save_record(&mut conn, "geo", "Varna", "y", &unit(2)).unwrap();

        let matches = search_records(&conn, "geo", &unit(0), 5, 0.0).unwrap();
        assert!(matches.iter().all(|m| m.record.collection == "geo"));
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn empty_store_returns_nothing() {
        let conn = test_db();
        assert!(search_records(&conn, "geo", &unit(0), 5, 0.0).unwrap().is_empty());
        assert_eq!(count_records(&conn, "geo").unwrap(), 0);
    }

    #[test]
    fn list_returns_collection_rows_in_insert_order() {
        let mut conn = test_db();
        save_record(&mut conn, "geo", "Sofia", "a", &unit(0)).unwrap();
        save_record(&mut conn, "geo", "Varna", "b", &unit(1)).unwrap();
        save_record(&mut conn, "notes", "x", "c", &unit(2)).unwrap();

        let keys: Vec<String> = list_records(&conn, "geo")
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["Sofia", "Varna"]);
        assert_eq!(count_records(&conn, "geo").unwrap(), 2);
    }

    #[test]
    fn records_for_key_matches_exactly() {
        let mut conn = test_db();
        save_record(&mut conn, "geo", "Sofia", "first", &unit(0)).unwrap();
        save_record(&mut conn, "geo", "sofia", "lower", &unit(0)).unwrap();
        save_record(&mut conn, "geo", "Sofia", "second", &unit(0)).unwrap();
        save_record(&mut conn, "notes", "Sofia", "other", &unit(0)).unwrap();

        let texts: Vec<String> = records_for_key(&conn, "geo", "Sofia")
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(records_for_key(&conn, "geo", "Varna").unwrap().is_empty());
    }

    #[test]
    fn key_lookup_uses_collection_key_index() {
        let conn = test_db();
        let plan: Vec<String> = conn
            .prepare(
                "EXPLAIN QUERY PLAN SELECT id FROM memory_records \
                 WHERE collection = ?1 AND key = ?2 ORDER BY rowid",
            )
            .unwrap()
            .query_map(params!["geo", "Sofia"], |row| row.get::<_, String>(3))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert!(
            plan.iter().any(|step| step.contains("idx_records_collection_key")),
            "{plan:?}"
        );
    }
}
