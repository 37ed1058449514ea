//! Recall engine error types.

use brain_embeddings::EmbeddingError;
use brain_storage::StorageError;
use brain_types::BrainError;
use brain_vector::VectorError;
use thiserror::Error;

/// Errors surfaced by [`crate::RecallEngine`].
///
/// A missing record is not an error; lookups return `Option` or `bool`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Text or query was empty after trimming. Nothing was written.
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),

    /// A per-call argument was out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The embedder and the store disagree on vector size
    #[error("Embedder produces {embedder}-dimensional vectors, store holds {store}")]
    DimensionMismatch { embedder: usize, store: usize },

    #[error("Configuration error: {0}")]
    Config(#[from] BrainError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Search error: {0}")]
    Vector(#[from] VectorError),
}
