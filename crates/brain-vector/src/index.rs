//! Vector index trait and types.
//!
//! Defines the interface for vector similarity search.

use brain_embeddings::Embedding;
use brain_types::MemoryRecord;

use crate::error::VectorError;

/// A search hit: a borrowed record and its distance from the query.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    pub record: &'a MemoryRecord,
    /// Cosine distance, 0 for identical direction, up to 2 for opposite.
    pub distance: f32,
}

/// Trait for vector indexes.
///
/// Implementations must be thread-safe for concurrent read access.
pub trait VectorIndex: Send + Sync {
    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Up to `k` records closest to `query`, closest first.
    ///
    /// Equal distances order the most recently created record first, then
    /// by id. Fewer than `k` records yields all of them; no records yields
    /// an empty result.
    fn search<'a>(
        &self,
        records: &'a [MemoryRecord],
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<Neighbor<'a>>, VectorError>;
}
