//! Vector index error types.

use thiserror::Error;

/// Errors that can occur during vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Query or stored vector has the wrong number of components
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Query vector contains NaN or infinite components
    #[error("Invalid query vector: {0}")]
    InvalidQuery(String),
}
