//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB operation failed
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Column family not found
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A record or embedding was rejected before writing
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Store was created for a different embedding dimension
    #[error("Store holds {stored}-dimensional embeddings, but {requested} was requested")]
    DimensionMismatch { stored: usize, requested: usize },

    /// Could not draw an unused id
    #[error("Could not generate an unused record id after {0} attempts")]
    IdExhausted(usize),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
