//! Embedding model trait and types.
//!
//! Defines the contract every embedder satisfies: text in, unit-length vector
//! of a fixed dimension out.

pub use brain_types::UNIT_NORM_TOLERANCE;

use crate::error::EmbeddingError;

/// Vector embedding - a normalized float array.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector (normalized to unit length)
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from a vector.
    /// Normalizes the vector to unit length; a zero vector is left as is.
    pub fn new(values: Vec<f32>) -> Self {
        let norm = l2_norm(&values);
        let normalized = if norm > 0.0 {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values: normalized }
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f32 {
        l2_norm(&self.values)
    }

    /// Whether the norm is within [`UNIT_NORM_TOLERANCE`] of 1.
    pub fn is_unit(&self) -> bool {
        (self.norm() - 1.0).abs() <= UNIT_NORM_TOLERANCE
    }

    /// Dot product with another embedding.
    ///
    /// For unit vectors this is the cosine similarity, in [-1, 1].
    /// Returns 0.0 when dimensions differ.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        dot(&self.values, &other.values)
    }
}

/// Dot product of two equal-length slices; 0.0 when lengths differ.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name (e.g., "all-MiniLM-L6-v2")
    pub name: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Maximum sequence length in tokens
    pub max_sequence_length: usize,
}

/// Trait for embedding models.
///
/// Implementations must be thread-safe (Send + Sync) and must return vectors
/// of exactly `info().dimension` components with unit norm.
pub trait EmbeddingModel: Send + Sync {
    /// Get model information
    fn info(&self) -> &ModelInfo;

    /// Generate embedding for a single text.
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Generate embeddings for multiple texts (batch).
    /// Default implementation calls embed() for each text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Semantic similarity of two texts: the dot product of their embeddings.
    fn similarity(&self, text1: &str, text2: &str) -> Result<f32, EmbeddingError> {
        let a = self.embed(text1)?;
        let b = self.embed(text2)?;
        Ok(a.cosine_similarity(&b))
    }
}
