pub mod search;
pub mod semantic;
pub mod store;
pub mod types;

pub use semantic::SemanticMemory;
pub use types::{MemoryMatch, MemoryRecord};

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            std::mem::size_of_val(embedding),
        )
    }
}

/// Convert a vec0 L2 distance between unit vectors into cosine similarity,
/// clamped to `[0, 1]`.
pub fn l2_to_relevance(distance: f64) -> f64 {
    (1.0 - distance * distance / 2.0).clamp(0.0, 1.0)
}
