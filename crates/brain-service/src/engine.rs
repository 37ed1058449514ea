//! Recall engine.
//!
//! Write path: text -> embedder -> record store.
//! Read path: query -> embedder -> similarity index (k candidates) ->
//! hybrid ranker (threshold, n results).

use std::path::PathBuf;
use std::sync::Arc;

use brain_embeddings::EmbeddingModel;
use brain_storage::RecordStore;
use brain_types::{MemoryRecord, MetadataMap, RetrievalSettings, Settings};
use brain_vector::{FlatIndex, VectorIndex};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::hybrid::{HybridRanker, RankCandidate, ScoreBreakdown};

/// Results shown by a query listing when no limit is given.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// A recalled record with its scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub record: MemoryRecord,
    pub short_id: String,
    pub scores: ScoreBreakdown,
}

impl ScoredResult {
    /// Final hybrid score.
    pub fn score(&self) -> f64 {
        self.scores.final_score
    }
}

/// Output of [`RecallEngine::list`].
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    /// Query given: records ranked by hybrid score.
    Ranked(Vec<ScoredResult>),
    /// No query: records newest first.
    Recent(Vec<MemoryRecord>),
}

impl Listing {
    pub fn len(&self) -> usize {
        match self {
            Listing::Ranked(results) => results.len(),
            Listing::Recent(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Summary of the engine's state.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub record_count: usize,
    /// Raw `created_at` of the newest record
    pub latest_created_at: Option<String>,
    pub model_name: String,
    pub dimension: usize,
    pub storage_path: PathBuf,
    pub disk_usage_bytes: u64,
}

/// Orchestrates embedding, storage, search and ranking.
pub struct RecallEngine {
    embedder: Arc<dyn EmbeddingModel>,
    store: Arc<RecordStore>,
    index: Box<dyn VectorIndex>,
    ranker: HybridRanker,
    retrieval: RetrievalSettings,
    confidence_threshold: f64,
}

impl RecallEngine {
    /// Build an engine over an embedder and an open store.
    ///
    /// Fails if the settings are invalid or the embedder's dimension differs
    /// from the store's.
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        store: Arc<RecordStore>,
        settings: &Settings,
    ) -> Result<Self, EngineError> {
        settings.retrieval.validate()?;
        let ranker = HybridRanker::new(&settings.scoring)?;

        let dimension = embedder.info().dimension;
        if dimension != store.dimension() {
            return Err(EngineError::DimensionMismatch {
                embedder: dimension,
                store: store.dimension(),
            });
        }

        Ok(Self {
            embedder,
            store,
            index: Box::new(FlatIndex::new(dimension)),
            ranker,
            retrieval: settings.retrieval.clone(),
            confidence_threshold: settings.scoring.confidence_threshold,
        })
    }

    /// Replace the similarity index.
    pub fn with_index(mut self, index: Box<dyn VectorIndex>) -> Result<Self, EngineError> {
        if index.dimension() != self.store.dimension() {
            return Err(EngineError::DimensionMismatch {
                embedder: index.dimension(),
                store: self.store.dimension(),
            });
        }
        self.index = index;
        Ok(self)
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingModel> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn ranker(&self) -> &HybridRanker {
        &self.ranker
    }

    /// Store a note.
    pub fn add(&self, text: &str) -> Result<MemoryRecord, EngineError> {
        self.add_with_metadata(text, MetadataMap::new())
    }

    /// Store a note with extra metadata. A textual `created_at` in
    /// `metadata` overrides the current time.
    pub fn add_with_metadata(
        &self,
        text: &str,
        metadata: MetadataMap,
    ) -> Result<MemoryRecord, EngineError> {
        if text.trim().is_empty() {
            return Err(EngineError::EmptyInput("memory text"));
        }

        let embedding = self.embedder.embed(text)?;
        let record = self
            .store
            .insert(text, embedding.values, metadata, Utc::now())?;

        info!(id = %record.id, short_id = %record.short_id(), "Added memory");
        Ok(record)
    }

    /// Hybrid recall.
    ///
    /// Fetches the `k_candidates` nearest records, ranks them at `now`, and
    /// returns at most `n_results` whose final score reaches `threshold`.
    pub fn recall(
        &self,
        query: &str,
        k_candidates: usize,
        n_results: usize,
        threshold: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredResult>, EngineError> {
        if query.trim().is_empty() {
            return Err(EngineError::EmptyInput("query"));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::InvalidArgument(format!(
                "threshold must be 0.0-1.0, got {threshold}"
            )));
        }

        let records = self.store.all_records()?;
        if records.is_empty() {
            debug!("Recall on empty store");
            return Ok(vec![]);
        }

        let query_embedding = self.embedder.embed(query)?;
        let neighbors = self.index.search(&records, &query_embedding, k_candidates)?;

        let candidates: Vec<RankCandidate> = neighbors
            .iter()
            .map(|n| RankCandidate {
                distance: n.distance,
                created_at: n.record.created_at(),
            })
            .collect();

        let results: Vec<ScoredResult> = self
            .ranker
            .rank(&candidates, threshold, n_results, now)
            .into_iter()
            .map(|ranked| {
                let record = neighbors[ranked.index].record.clone();
                ScoredResult {
                    short_id: record.short_id().to_string(),
                    record,
                    scores: ranked.scores,
                }
            })
            .collect();

        debug!(
            k = k_candidates,
            candidates = candidates.len(),
            returned = results.len(),
            "Recall complete"
        );
        Ok(results)
    }

    /// Recall with the configured candidate count, result count and
    /// confidence threshold.
    pub fn recall_default(
        &self,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredResult>, EngineError> {
        self.recall(
            query,
            self.retrieval.top_k_retrieval,
            self.retrieval.top_n_results,
            self.confidence_threshold,
            now,
        )
    }

    /// Recall with an optional result count and threshold, falling back to
    /// the configured values. The candidate pool grows to cover `n`.
    pub fn recall_with(
        &self,
        query: &str,
        n_results: Option<usize>,
        threshold: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredResult>, EngineError> {
        let n = n_results.unwrap_or(self.retrieval.top_n_results);
        self.recall(
            query,
            self.retrieval.top_k_retrieval.max(n),
            n,
            threshold.unwrap_or(self.confidence_threshold),
            now,
        )
    }

    /// Browse memories.
    ///
    /// With a non-blank query this is a recall with threshold 0 returning up
    /// to `limit` (default [`DEFAULT_LIST_LIMIT`]) results. Without one it is
    /// the newest `limit` records, or all of them.
    pub fn list(
        &self,
        query: Option<&str>,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Listing, EngineError> {
        match query.filter(|q| !q.trim().is_empty()) {
            Some(query) => {
                let n = limit.unwrap_or(DEFAULT_LIST_LIMIT);
                let k = self.retrieval.top_k_retrieval.max(n);
                Ok(Listing::Ranked(self.recall(query, k, n, 0.0, now)?))
            }
            None => Ok(Listing::Recent(self.store.list(limit)?)),
        }
    }

    /// Look up a memory by full or short id.
    pub fn get(&self, id_or_prefix: &str) -> Result<Option<MemoryRecord>, EngineError> {
        Ok(self.store.get(id_or_prefix)?)
    }

    /// Ids matching a short id, to warn about ambiguity before acting.
    pub fn matching_ids(&self, prefix: &str) -> Result<Vec<String>, EngineError> {
        Ok(self.store.matching_ids(prefix)?)
    }

    /// Delete a memory by full or short id. Returns whether one was removed.
    pub fn delete(&self, id_or_prefix: &str) -> Result<bool, EngineError> {
        Ok(self.store.delete(id_or_prefix)?)
    }

    /// Delete every memory. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, EngineError> {
        Ok(self.store.clear()?)
    }

    pub fn count(&self) -> Result<usize, EngineError> {
        Ok(self.store.count()?)
    }

    /// Dot product of the embeddings of two texts.
    pub fn embed_similarity(&self, text1: &str, text2: &str) -> Result<f32, EngineError> {
        if text1.trim().is_empty() || text2.trim().is_empty() {
            return Err(EngineError::EmptyInput("text"));
        }
        Ok(self.embedder.similarity(text1, text2)?)
    }

    pub fn stats(&self) -> Result<EngineStats, EngineError> {
        let storage = self.store.get_stats()?;
        let latest = self.store.latest()?;
        let info = self.embedder.info();
        Ok(EngineStats {
            record_count: storage.record_count,
            latest_created_at: latest.map(|r| r.metadata.created_at),
            model_name: info.name.clone(),
            dimension: info.dimension,
            storage_path: self.store.path().to_path_buf(),
            disk_usage_bytes: storage.disk_usage_bytes,
        })
    }
}
