//! # brain-types
//!
//! Shared domain types for the Second Brain recall engine.
//!
//! This crate defines the data structures used throughout the system:
//! - Records: immutable notes with their embedding and metadata
//! - Short ids: the 4-character display form of a record id
//! - Settings: layered configuration for scoring, retrieval and embedding
//!
//! ## Usage
//!
//! ```rust
//! use brain_types::{short_id, Settings};
//!
//! let settings = Settings::default();
//! assert!(settings.validate().is_ok());
//! assert_eq!(short_id("a3f2c0ffee"), "a3f2");
//! ```

pub mod config;
pub mod error;
pub mod record;

pub use config::{
    CliSettings, EmbedderProvider, EmbedderSettings, RetrievalSettings, ScoringSettings, Settings,
    WEIGHT_SUM_TOLERANCE,
};
pub use error::BrainError;
pub use record::{
    format_timestamp, newest_first, parse_timestamp, short_id, MemoryRecord, Metadata,
    MetadataMap, MetadataValue, CREATED_AT_KEY, SHORT_ID_LEN, UNIT_NORM_TOLERANCE,
};
