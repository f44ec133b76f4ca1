//! Text-level front end of the vector store.
//!
//! [`SemanticMemory`] embeds text through an [`EmbeddingProvider`] and runs
//! the synchronous SQLite read/write paths on the blocking pool.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use super::types::{MemoryMatch, MemoryRecord};
use crate::config::MemoryConfig;
use crate::embedding::EmbeddingProvider;

#[derive(Clone)]
pub struct SemanticMemory {
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    search_limit: usize,
    min_relevance: f64,
}

impl SemanticMemory {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        embedding: Arc<dyn EmbeddingProvider>,
        config: &MemoryConfig,
    ) -> Self {
        Self {
            db,
            embedding,
            search_limit: config.search_limit,
            min_relevance: config.min_relevance,
        }
    }

    /// Similarity search for `query` within `collection`, most similar first.
    pub async fn search(&self, collection: &str, query: &str) -> Result<Vec<MemoryMatch>> {
        let query_embedding = self.embedding.embed(query).await?;

        let collection = collection.to_string();
        let limit = self.search_limit;
        let min_relevance = self.min_relevance;
        self.with_conn(move |conn| {
            super::search::search_records(conn, &collection, &query_embedding, limit, min_relevance)
        })
        .await
    }

    /// Save `text` under `collection`, indexed by the embedding of `key`.
    /// Returns the new row id.
    pub async fn save(&self, collection: &str, text: &str, key: &str) -> Result<String> {
        let embedding = self.embedding.embed(key).await?;

        let collection = collection.to_string();
        let text = text.to_string();
        let key = key.to_string();
        self.with_conn(move |conn| {
            super::store::save_record(conn, &collection, &key, &text, &embedding)
        })
        .await
    }

    /// All records of `collection`, oldest first.
    pub async fn list(&self, collection: &str) -> Result<Vec<MemoryRecord>> {
        let collection = collection.to_string();
        self.with_conn(move |conn| super::search::list_records(conn, &collection))
            .await
    }

    /// Records of `collection` saved under exactly `key`, oldest first.
    pub async fn records_for_key(&self, collection: &str, key: &str) -> Result<Vec<MemoryRecord>> {
        let collection = collection.to_string();
        let key = key.to_string();
        self.with_conn(move |conn| super::search::records_for_key(conn, &collection, &key))
            .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow!("db lock poisoned: {e}"))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| anyhow!("db task failed: {e}"))?
    }
}
