//! Exact full-scan index.

use std::cmp::Ordering;

use brain_embeddings::model::dot;
use brain_embeddings::Embedding;
use brain_types::{newest_first, MemoryRecord};
use tracing::debug;

use crate::error::VectorError;
use crate::index::{Neighbor, VectorIndex};

/// Cosine distance between two unit vectors: `1 - dot(a, b)`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - dot(a, b)
}

/// Brute-force cosine index. Stateless; scans whatever records it is given.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn check_dimension(&self, actual: usize) -> Result<(), VectorError> {
        if actual != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

fn closest_first(a: &Neighbor<'_>, b: &Neighbor<'_>) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| newest_first(a.record, b.record))
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn search<'a>(
        &self,
        records: &'a [MemoryRecord],
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<Neighbor<'a>>, VectorError> {
        self.check_dimension(query.dimension())?;
        if query.values.iter().any(|x| !x.is_finite()) {
            return Err(VectorError::InvalidQuery(
                "query contains non-finite values".to_string(),
            ));
        }
        if k == 0 || records.is_empty() {
            return Ok(vec![]);
        }

        let mut neighbors = records
            .iter()
            .map(|record| {
                self.check_dimension(record.embedding.len())?;
                Ok(Neighbor {
                    record,
                    distance: cosine_distance(&query.values, &record.embedding),
                })
            })
            .collect::<Result<Vec<_>, VectorError>>()?;

        neighbors.sort_by(closest_first);
        neighbors.truncate(k);

        debug!(k, scanned = records.len(), found = neighbors.len(), "Flat search");
        Ok(neighbors)
    }
}
