//! Storage layer for Second Brain.
//!
//! Provides a RocksDB-backed record store with:
//! - Column family isolation for records, tombstones and store metadata
//! - Random 128-bit hex ids that are never reissued, even after deletion
//! - Atomic, synced writes via WriteBatch
//! - Short-id prefix resolution with a most-recent policy for collisions
//! - A persisted embedding dimension that guards against mixed-model stores

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;

pub use db::{RecordStore, StorageStats};
pub use error::StorageError;
pub use keys::{new_record_id, normalize_lookup, RECORD_ID_LEN};
