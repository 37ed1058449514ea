//! # brain-embeddings
//!
//! Text-to-vector embedding for Second Brain.
//!
//! Every model implements [`EmbeddingModel`] and returns unit-length vectors
//! of a fixed dimension, so cosine similarity reduces to a dot product.
//!
//! ## Models
//! - [`CandleEmbedder`]: all-MiniLM-L6-v2 (384 dimensions) run locally via
//!   Candle, with model files cached from HuggingFace Hub on first use
//! - [`HashingEmbedder`]: deterministic feature hashing of words and character
//!   trigrams; needs no model and works offline

pub mod cache;
pub mod candle;
pub mod error;
pub mod factory;
pub mod hashing;
pub mod model;

pub use crate::candle::CandleEmbedder;
pub use cache::{get_or_download_model, ModelCache, ModelPaths, DEFAULT_MODEL_REPO, MODEL_FILES};
pub use error::EmbeddingError;
pub use factory::embedder_from_settings;
pub use hashing::HashingEmbedder;
pub use model::{Embedding, EmbeddingModel, ModelInfo, UNIT_NORM_TOLERANCE};
