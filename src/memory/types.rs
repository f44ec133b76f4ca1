//! Vector memory record types.

use serde::Serialize;

/// One saved row of the vector store.
///
/// `key` is the text that was embedded and the lookup key callers match on;
/// `text` is the opaque payload stored alongside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryRecord {
    /// UUID v7 row id. Saving the same key twice yields two rows.
    pub id: String,
    pub collection: String,
    pub key: String,
    pub text: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// A similarity search hit.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryMatch {
    pub record: MemoryRecord,
    /// Cosine similarity between query and stored embedding, in `[0, 1]`.
    pub relevance: f64,
}
