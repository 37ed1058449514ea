//! Hybrid relevance and recency ranking.
//!
//! Each candidate gets two scores in [0, 1]:
//! - similarity = clamp(1 - cosine_distance, 0, 1)
//! - recency = exp(-age_days * decay_rate)
//!
//! fused as `similarity * W_sim + recency * W_rec` with `W_sim + W_rec = 1`.
//! The ranker is pure: the reference time is always passed in.

use brain_types::{BrainError, ScoringSettings};
use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Recency assigned when a record's timestamp is missing or unparsable.
pub const NEUTRAL_RECENCY: f64 = 0.5;

/// What the ranker needs to know about one search hit.
#[derive(Debug, Clone, Copy)]
pub struct RankCandidate {
    /// Cosine distance from the query.
    pub distance: f32,
    /// Creation time, `None` if unknown.
    pub created_at: Option<DateTime<Utc>>,
}

/// Component scores of one ranked candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub similarity: f64,
    pub recency: f64,
    pub distance: f64,
    pub final_score: f64,
}

/// A candidate that survived ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    /// Position of the candidate in the input slice.
    pub index: usize,
    pub scores: ScoreBreakdown,
}

/// Weighted similarity/recency ranker.
#[derive(Debug, Clone)]
pub struct HybridRanker {
    similarity_weight: f64,
    recency_weight: f64,
    decay_rate: f64,
}

impl HybridRanker {
    /// Build a ranker, rejecting weights that do not sum to 1 and negative
    /// decay rates.
    pub fn new(settings: &ScoringSettings) -> Result<Self, BrainError> {
        settings.validate()?;
        Ok(Self {
            similarity_weight: settings.similarity_weight,
            recency_weight: settings.recency_weight,
            decay_rate: settings.recency_decay_rate,
        })
    }

    pub fn similarity_weight(&self) -> f64 {
        self.similarity_weight
    }

    pub fn recency_weight(&self) -> f64 {
        self.recency_weight
    }

    /// Map a cosine distance to a similarity in [0, 1].
    pub fn similarity_score(distance: f32) -> f64 {
        let similarity = 1.0 - f64::from(distance);
        if similarity.is_nan() {
            return 0.0;
        }
        similarity.clamp(0.0, 1.0)
    }

    /// Exponential decay by age. 1 at age zero, approaching 0 with age.
    ///
    /// A timestamp later than `now` counts as age zero.
    pub fn recency_score(&self, created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(created_at) = created_at else {
            return NEUTRAL_RECENCY;
        };
        let age_seconds = (now - created_at).num_milliseconds() as f64 / 1000.0;
        let age_days = age_seconds.max(0.0) / SECONDS_PER_DAY;
        (-age_days * self.decay_rate).exp()
    }

    /// Score a single candidate.
    pub fn score(&self, candidate: &RankCandidate, now: DateTime<Utc>) -> ScoreBreakdown {
        let similarity = Self::similarity_score(candidate.distance);
        let recency = self.recency_score(candidate.created_at, now);
        ScoreBreakdown {
            similarity,
            recency,
            distance: f64::from(candidate.distance),
            final_score: similarity * self.similarity_weight + recency * self.recency_weight,
        }
    }

    /// Score every candidate, order by final score (highest first), drop
    /// those below `threshold` and keep at most `limit`.
    ///
    /// The sort is stable, so equal scores keep their input order.
    pub fn rank(
        &self,
        candidates: &[RankCandidate],
        threshold: f64,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<Ranked> {
        let mut ranked: Vec<Ranked> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| Ranked {
                index,
                scores: self.score(candidate, now),
            })
            .collect();

        ranked.sort_by(|a, b| b.scores.final_score.total_cmp(&a.scores.final_score));
        ranked.retain(|r| r.scores.final_score >= threshold);
        ranked.truncate(limit);
        ranked
    }
}
