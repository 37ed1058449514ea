//! Configuration loading for Second Brain.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/second-brain/config.toml.
//!
//! Every numeric setting is validated when loaded. A bad weight sum or an
//! out-of-range threshold is a startup error, never clamped at query time.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::BrainError;

/// Allowed floating-point slack when checking that the two weights sum to 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Hybrid scoring parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Share of the final score taken from semantic similarity.
    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f64,

    /// Share of the final score taken from recency. Must sum to 1 with
    /// `similarity_weight`.
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,

    /// Exponential decay rate per day: `recency = exp(-days_old * rate)`.
    /// 0.05 is gentle, 0.1 moderate, 0.2 fast.
    #[serde(default = "default_recency_decay_rate")]
    pub recency_decay_rate: f64,

    /// Minimum final score a recall result must reach.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

fn default_similarity_weight() -> f64 {
    0.7
}

fn default_recency_weight() -> f64 {
    0.3
}

fn default_recency_decay_rate() -> f64 {
    0.1
}

fn default_confidence_threshold() -> f64 {
    0.3
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            similarity_weight: default_similarity_weight(),
            recency_weight: default_recency_weight(),
            recency_decay_rate: default_recency_decay_rate(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

impl ScoringSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), BrainError> {
        for (name, weight) in [
            ("similarity_weight", self.similarity_weight),
            ("recency_weight", self.recency_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(BrainError::Config(format!(
                    "{name} must be a non-negative number, got {weight}"
                )));
            }
        }
        let sum = self.similarity_weight + self.recency_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(BrainError::Config(format!(
                "similarity_weight + recency_weight must equal 1.0, got {sum}"
            )));
        }
        if !self.recency_decay_rate.is_finite() || self.recency_decay_rate < 0.0 {
            return Err(BrainError::Config(format!(
                "recency_decay_rate must be >= 0, got {}",
                self.recency_decay_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(BrainError::Config(format!(
                "confidence_threshold must be 0.0-1.0, got {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }
}

/// Candidate retrieval sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Nearest neighbours fetched before re-ranking.
    #[serde(default = "default_top_k_retrieval")]
    pub top_k_retrieval: usize,

    /// Results returned after re-ranking.
    #[serde(default = "default_top_n_results")]
    pub top_n_results: usize,
}

fn default_top_k_retrieval() -> usize {
    10
}

fn default_top_n_results() -> usize {
    3
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k_retrieval: default_top_k_retrieval(),
            top_n_results: default_top_n_results(),
        }
    }
}

impl RetrievalSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), BrainError> {
        if self.top_k_retrieval == 0 {
            return Err(BrainError::Config("top_k_retrieval must be > 0".to_string()));
        }
        if self.top_n_results == 0 {
            return Err(BrainError::Config("top_n_results must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Which embedder backs the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderProvider {
    /// Local BERT inference via Candle (downloads the model on first use)
    #[default]
    Candle,
    /// Deterministic feature-hashing embedder (offline, no model)
    Hashing,
}

/// Embedder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderSettings {
    #[serde(default)]
    pub provider: EmbedderProvider,

    /// HuggingFace repository of the sentence-transformer model
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    /// Model cache directory (defaults to the platform cache dir)
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// Output dimension of the hashing embedder
    #[serde(default = "default_hashing_dimension")]
    pub dimension: usize,
}

fn default_model_repo() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_hashing_dimension() -> usize {
    384
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            provider: EmbedderProvider::default(),
            model_repo: default_model_repo(),
            cache_dir: None,
            dimension: default_hashing_dimension(),
        }
    }
}

/// Presentation settings used by the `brain` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliSettings {
    /// Show a preview and ask before saving a memory
    #[serde(default = "default_confirm_before_save")]
    pub confirm_before_save: bool,

    /// Maximum characters shown per memory in listings
    #[serde(default = "default_preview_max_length")]
    pub preview_max_length: usize,
}

fn default_confirm_before_save() -> bool {
    true
}

fn default_preview_max_length() -> usize {
    200
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            confirm_before_save: default_confirm_before_save(),
            preview_max_length: default_preview_max_length(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the RocksDB record store directory
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub scoring: ScoringSettings,

    #[serde(default)]
    pub retrieval: RetrievalSettings,

    #[serde(default)]
    pub embedder: EmbedderSettings,

    #[serde(default)]
    pub cli: CliSettings,
}

fn default_storage_path() -> String {
    ProjectDirs::from("", "", "second-brain")
        .map(|p| p.data_local_dir().join("store"))
        .unwrap_or_else(|| PathBuf::from("./data/store"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            log_level: default_log_level(),
            scoring: ScoringSettings::default(),
            retrieval: RetrievalSettings::default(),
            embedder: EmbedderSettings::default(),
            cli: CliSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/second-brain/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (BRAIN_*, nested with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns, followed
    /// by another call to [`Settings::validate`].
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, BrainError> {
        let config_dir = ProjectDirs::from("", "", "second-brain")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("storage_path", default_storage_path())?
            .set_default("log_level", default_log_level())?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // BRAIN_STORAGE_PATH, BRAIN_SCORING__SIMILARITY_WEIGHT, ...
        builder = builder.add_source(
            Environment::with_prefix("BRAIN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject misconfigured values. Called by [`Settings::load`]; call again
    /// after applying CLI overrides.
    pub fn validate(&self) -> Result<(), BrainError> {
        self.scoring.validate()?;
        self.retrieval.validate()?;
        if self.embedder.dimension == 0 {
            return Err(BrainError::Config("embedder.dimension must be > 0".to_string()));
        }
        if self.storage_path.trim().is_empty() {
            return Err(BrainError::Config("storage_path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Storage path with `~` and environment variables expanded.
    pub fn expanded_storage_path(&self) -> PathBuf {
        match shellexpand::full(&self.storage_path) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => PathBuf::from(shellexpand::tilde(&self.storage_path).as_ref()),
        }
    }

    /// Model cache directory, if overridden.
    pub fn expanded_cache_dir(&self) -> Option<PathBuf> {
        self.embedder
            .cache_dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).as_ref()))
    }
}
