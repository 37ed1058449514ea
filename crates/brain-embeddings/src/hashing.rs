//! Feature-hashing embedder.
//!
//! Maps lowercase word unigrams and character trigrams into a fixed number of
//! buckets with FNV-1a, using a second hash bit for the sign so collisions
//! tend to cancel rather than accumulate. Identical texts always produce
//! identical vectors, and texts sharing words or word fragments score higher
//! than unrelated texts. It captures lexical overlap only, not meaning.

use tracing::debug;

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Weight of a whole-word feature.
const WORD_WEIGHT: f32 = 1.0;

/// Weight of a character-trigram feature.
const TRIGRAM_WEIGHT: f32 = 0.5;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic, model-free embedder.
pub struct HashingEmbedder {
    info: ModelInfo,
}

impl HashingEmbedder {
    /// Create an embedder producing `dimension`-component vectors.
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidInput(
                "hashing dimension must be > 0".to_string(),
            ));
        }
        Ok(Self {
            info: ModelInfo {
                name: "feature-hashing".to_string(),
                dimension,
                max_sequence_length: usize::MAX,
            },
        })
    }

    fn add_feature(&self, buckets: &mut [f32], feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let index = (hash % buckets.len() as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        buckets[index] += sign * weight;
    }
}

impl EmbeddingModel for HashingEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("cannot embed empty text".to_string()));
        }

        let lowered = text.to_lowercase();
        let mut buckets = vec![0.0f32; self.info.dimension];
        let mut features = 0usize;

        for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            self.add_feature(&mut buckets, word, WORD_WEIGHT);
            features += 1;

            let padded: Vec<char> = format!(" {word} ").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut buckets, &trigram, TRIGRAM_WEIGHT);
                features += 1;
            }
        }

        // Text made only of symbols still gets a stable vector.
        if features == 0 {
            self.add_feature(&mut buckets, &lowered, WORD_WEIGHT);
        }

        let mut embedding = Embedding::new(buckets);
        if !embedding.is_unit() {
            // Every feature cancelled out; fall back to the whole text.
            let mut buckets = vec![0.0f32; self.info.dimension];
            self.add_feature(&mut buckets, &lowered, WORD_WEIGHT);
            embedding = Embedding::new(buckets);
        }

        debug!(features, dim = self.info.dimension, "Hashed text");
        Ok(embedding)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder() -> HashingEmbedder {
        HashingEmbedder::new(384).unwrap()
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(HashingEmbedder::new(0).is_err());
    }

    #[test]
    fn test_unit_norm_and_dimension() {
        let emb = embedder().embed("passport in blue suitcase").unwrap();
        assert_eq!(emb.dimension(), 384);
        assert!(emb.is_unit());
    }

    #[test]
    fn test_deterministic() {
        let e = embedder();
        let a = e.embed("Keys are in my jacket pocket").unwrap();
        let b = e.embed("Keys are in my jacket pocket").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identical_text_similarity_is_one() {
        let sim = embedder()
            .similarity("passport in blue suitcase", "passport in blue suitcase")
            .unwrap();
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let sim = embedder()
            .similarity("Passport, in blue suitcase!", "passport in blue suitcase")
            .unwrap();
        assert!(sim > 0.99);
    }

    #[test]
    fn test_overlap_beats_unrelated() {
        let e = embedder();
        let related = e.similarity("where is my passport", "passport in blue suitcase").unwrap();
        let unrelated = e
            .similarity("completely unrelated query about space aliens", "passport in blue suitcase")
            .unwrap();
        assert!(related > unrelated);
        assert!(unrelated < 0.5);
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(matches!(
            embedder().embed("   "),
            Err(EmbeddingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_symbols_only_text() {
        let emb = embedder().embed("!!! ???").unwrap();
        assert!(emb.is_unit());
    }

    #[test]
    fn test_unicode_text() {
        let e = embedder();
        let sim = e.similarity("Café address: 日本 Tokyo 🗼", "café").unwrap();
        assert!(sim > 0.0);
    }
}
