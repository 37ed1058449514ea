//! Recall engine for Second Brain.
//!
//! Provides:
//! - [`HybridRanker`]: fuses cosine similarity with exponential recency decay
//! - [`RecallEngine`]: add, recall, list, get, delete and clear over an
//!   embedder, a record store and a similarity index

pub mod engine;
pub mod error;
pub mod hybrid;

pub use engine::{EngineStats, Listing, RecallEngine, ScoredResult, DEFAULT_LIST_LIMIT};
pub use error::EngineError;
pub use hybrid::{HybridRanker, RankCandidate, Ranked, ScoreBreakdown, NEUTRAL_RECENCY};
