//! End-to-end test infrastructure for the Second Brain recall engine.
//!
//! Provides a shared TestHarness and helpers that build records with
//! chosen ids and timestamps, so the add-then-recall pipeline can be
//! exercised deterministically with the hashing embedder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use brain_embeddings::{EmbeddingModel, HashingEmbedder};
use brain_service::RecallEngine;
use brain_storage::RecordStore;
use brain_types::{
    format_timestamp, MemoryRecord, Metadata, MetadataMap, Settings, CREATED_AT_KEY,
};

/// Embedding dimension used by every harness.
pub const TEST_DIMENSION: usize = 256;

/// Shared test harness for E2E tests.
///
/// Owns a temp directory holding the record store and an engine over it.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Record store directory
    pub store_path: PathBuf,
    /// Engine wired to the hashing embedder
    pub engine: RecallEngine,
}

impl TestHarness {
    /// Create a new harness with default settings.
    pub fn new() -> Self {
        Self::with_settings(&Settings::default())
    }

    /// Create a new harness with custom settings.
    pub fn with_settings(settings: &Settings) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let store_path = temp_dir.path().join("records");
        let engine = open_engine(&store_path, settings);
        Self {
            _temp_dir: temp_dir,
            store_path,
            engine,
        }
    }

    /// Close the store and open it again from disk.
    pub fn reopen(self) -> Self {
        let TestHarness {
            _temp_dir,
            store_path,
            engine,
        } = self;
        drop(engine);
        let engine = open_engine(&store_path, &Settings::default());
        Self {
            _temp_dir,
            store_path,
            engine,
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        self.engine.store()
    }

    /// Add a note whose creation time is `created_at`.
    pub fn add_at(&self, text: &str, created_at: DateTime<Utc>) -> MemoryRecord {
        let mut metadata = MetadataMap::new();
        metadata.insert(
            CREATED_AT_KEY.to_string(),
            format_timestamp(created_at).into(),
        );
        self.engine
            .add_with_metadata(text, metadata)
            .expect("Failed to add memory")
    }

    /// Import a record with a chosen id, e.g. to force short-id collisions.
    pub fn import(&self, id: &str, text: &str, created_at: Option<DateTime<Utc>>) -> MemoryRecord {
        let record = build_record(self.engine.embedder().as_ref(), id, text, created_at);
        let inserted = self
            .store()
            .insert_record(&record)
            .expect("Failed to import record");
        assert!(inserted, "id {id} was already taken");
        record
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Open a store at `path` and an engine over it using the hashing embedder.
pub fn open_engine(path: &Path, settings: &Settings) -> RecallEngine {
    std::fs::create_dir_all(path).expect("Failed to create store dir");
    let store = Arc::new(RecordStore::open(path, TEST_DIMENSION).expect("Failed to open store"));
    let embedder =
        Arc::new(HashingEmbedder::new(TEST_DIMENSION).expect("Failed to build embedder"));
    RecallEngine::new(embedder, store, settings).expect("Failed to build engine")
}

/// Build a record with an explicit id. `None` leaves the timestamp empty.
pub fn build_record(
    embedder: &dyn EmbeddingModel,
    id: &str,
    text: &str,
    created_at: Option<DateTime<Utc>>,
) -> MemoryRecord {
    let embedding = embedder.embed(text).expect("Failed to embed text");
    MemoryRecord {
        id: id.to_string(),
        text: text.to_string(),
        embedding: embedding.values,
        metadata: Metadata {
            created_at: created_at.map(format_timestamp).unwrap_or_default(),
            extra: MetadataMap::new(),
        },
    }
}

/// A full 32-character id starting with `prefix`, padded with `fill`.
pub fn id_with_prefix(prefix: &str, fill: u128) -> String {
    let fill = format!("{fill:032x}");
    format!("{prefix}{}", &fill[prefix.len()..])
}

/// Random note texts for bulk tests.
pub fn random_notes(count: usize) -> Vec<String> {
    const WORDS: &[&str] = &[
        "passport", "keys", "dentist", "garden", "invoice", "train", "birthday", "recipe",
        "laptop", "umbrella", "meeting", "book", "password", "gym", "coffee", "bank",
    ];
    (0..count)
        .map(|i| {
            let a = WORDS[rand::random_range(0..WORDS.len())];
            let b = WORDS[rand::random_range(0..WORDS.len())];
            format!("note {i}: {a} and {b}")
        })
        .collect()
}
