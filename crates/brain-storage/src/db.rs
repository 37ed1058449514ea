//! RocksDB wrapper for the record store.
//!
//! Provides:
//! - Database open/close with column family setup and a dimension guard
//! - Atomic, synced write batches for insert, delete and clear
//! - Point lookup by full id or short-id prefix
//! - Recency-ordered listing

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use brain_types::{
    newest_first, MemoryRecord, Metadata, MetadataMap, MetadataValue, UNIT_NORM_TOLERANCE,
};
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use tracing::{debug, info, warn};

use crate::column_families::{
    build_cf_descriptors, ALL_CF_NAMES, CF_META, CF_RECORDS, CF_TOMBSTONES,
};
use crate::error::StorageError;
use crate::keys::{
    decode_dimension, encode_dimension, new_record_id, normalize_lookup, META_DIMENSION_KEY,
    RECORD_ID_LEN,
};

/// Fresh ids drawn before giving up on a collision streak.
const MAX_ID_ATTEMPTS: usize = 8;

/// Durable store of memory records.
///
/// Mutations take the write lock and readers share the read lock, so a
/// store behind `Arc` can be used from several threads. Only one process
/// may open a given path at a time (RocksDB holds a file lock).
pub struct RecordStore {
    db: DB,
    path: PathBuf,
    dimension: usize,
    lock: RwLock<()>,
}

impl RecordStore {
    /// Open the store at `path`, creating it if necessary.
    ///
    /// A new store records `dimension`; an existing store must have been
    /// created with the same dimension.
    pub fn open(path: &Path, dimension: usize) -> Result<Self, StorageError> {
        if dimension == 0 {
            return Err(StorageError::InvalidRecord(
                "embedding dimension must be > 0".to_string(),
            ));
        }

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;
        let store = Self {
            db,
            path: path.to_path_buf(),
            dimension,
            lock: RwLock::new(()),
        };
        store.check_dimension()?;

        info!(path = ?path, records = store.count()?, dim = dimension, "Opened record store");
        Ok(store)
    }

    /// Persist the dimension on first open; reject a different one afterwards.
    fn check_dimension(&self) -> Result<(), StorageError> {
        let meta = self.cf(CF_META)?;
        match self.db.get_cf(meta, META_DIMENSION_KEY)? {
            Some(bytes) => {
                let stored = decode_dimension(&bytes)?;
                if stored != self.dimension {
                    return Err(StorageError::DimensionMismatch {
                        stored,
                        requested: self.dimension,
                    });
                }
            }
            None => {
                let mut batch = WriteBatch::default();
                batch.put_cf(meta, META_DIMENSION_KEY, encode_dimension(self.dimension));
                self.write(batch)?;
            }
        }
        Ok(())
    }

    /// Embedding dimension of every stored record.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Directory holding the database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a new note and return the created record.
    ///
    /// Draws an id that has never been used in this store and stamps `now`
    /// as `created_at` unless `metadata` already carries one.
    pub fn insert(
        &self,
        text: &str,
        embedding: Vec<f32>,
        metadata: MetadataMap,
        now: DateTime<Utc>,
    ) -> Result<MemoryRecord, StorageError> {
        self.validate_embedding(&embedding)?;
        validate_metadata(&metadata)?;

        let _guard = self.write_guard();
        let id = self.unused_id()?;
        let record = MemoryRecord {
            id,
            text: text.to_string(),
            embedding,
            metadata: Metadata::stamped(metadata, now),
        };

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_RECORDS)?, record.id.as_bytes(), record.to_bytes()?);
        self.write(batch)?;

        debug!(id = %record.id, "Inserted record");
        Ok(record)
    }

    /// Store a fully formed record, keeping its id and timestamp.
    ///
    /// Returns `false` without writing if the id is live or was deleted.
    pub fn insert_record(&self, record: &MemoryRecord) -> Result<bool, StorageError> {
        if record.id.len() != RECORD_ID_LEN
            || normalize_lookup(&record.id).as_deref() != Some(record.id.as_str())
        {
            return Err(StorageError::InvalidRecord(format!(
                "id must be {} lowercase hex characters: {}",
                RECORD_ID_LEN, record.id
            )));
        }
        self.validate_embedding(&record.embedding)?;
        validate_metadata(&record.metadata.extra)?;

        let _guard = self.write_guard();
        if self.id_taken(&record.id)? {
            debug!(id = %record.id, "Record id already used, skipping");
            return Ok(false);
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_RECORDS)?, record.id.as_bytes(), record.to_bytes()?);
        self.write(batch)?;

        debug!(id = %record.id, "Imported record");
        Ok(true)
    }

    /// Look up a record by full id or id prefix.
    pub fn get(&self, id_or_prefix: &str) -> Result<Option<MemoryRecord>, StorageError> {
        let _guard = self.read_guard();
        self.resolve(id_or_prefix)
    }

    /// Ids of all live records starting with `prefix`, in key order.
    pub fn matching_ids(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let Some(prefix) = normalize_lookup(prefix) else {
            return Ok(vec![]);
        };
        let _guard = self.read_guard();
        Ok(self
            .records_with_prefix(&prefix)?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    /// Delete the record `id_or_prefix` resolves to.
    ///
    /// Returns whether a record was removed. The id is tombstoned and never
    /// reissued.
    pub fn delete(&self, id_or_prefix: &str) -> Result<bool, StorageError> {
        let _guard = self.write_guard();
        let Some(record) = self.resolve(id_or_prefix)? else {
            return Ok(false);
        };

        let mut batch = WriteBatch::default();
        batch.delete_cf(self.cf(CF_RECORDS)?, record.id.as_bytes());
        batch.put_cf(self.cf(CF_TOMBSTONES)?, record.id.as_bytes(), b"");
        self.write(batch)?;

        info!(id = %record.id, "Deleted record");
        Ok(true)
    }

    /// All live records, newest first, truncated to `limit` if given.
    pub fn list(&self, limit: Option<usize>) -> Result<Vec<MemoryRecord>, StorageError> {
        let mut records = self.all_records()?;
        records.sort_by(newest_first);
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Most recently created record.
    pub fn latest(&self) -> Result<Option<MemoryRecord>, StorageError> {
        Ok(self.all_records()?.into_iter().min_by(newest_first))
    }

    /// All live records in key order.
    pub fn all_records(&self) -> Result<Vec<MemoryRecord>, StorageError> {
        let _guard = self.read_guard();
        let mut records = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_RECORDS)?, IteratorMode::Start) {
            let (_, value) = item?;
            records.push(MemoryRecord::from_bytes(&value)?);
        }
        Ok(records)
    }

    /// Number of live records.
    pub fn count(&self) -> Result<usize, StorageError> {
        let _guard = self.read_guard();
        self.count_cf_entries(self.cf(CF_RECORDS)?)
    }

    /// Remove every record. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, StorageError> {
        let _guard = self.write_guard();
        let records = self.cf(CF_RECORDS)?;
        let tombstones = self.cf(CF_TOMBSTONES)?;

        let mut batch = WriteBatch::default();
        let mut removed = 0usize;
        for item in self.db.iterator_cf(records, IteratorMode::Start) {
            let (key, _) = item?;
            batch.delete_cf(records, &key);
            batch.put_cf(tombstones, &key, b"");
            removed += 1;
        }

        if removed > 0 {
            self.write(batch)?;
        }
        info!(count = removed, "Cleared record store");
        Ok(removed)
    }

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(cf)?;
            }
        }
        Ok(())
    }

    /// Get database statistics.
    pub fn get_stats(&self) -> Result<StorageStats, StorageError> {
        let _guard = self.read_guard();
        Ok(StorageStats {
            record_count: self.count_cf_entries(self.cf(CF_RECORDS)?)?,
            tombstone_count: self.count_cf_entries(self.cf(CF_TOMBSTONES)?)?,
            dimension: self.dimension,
            disk_usage_bytes: self.get_disk_usage(),
        })
    }

    // ===== Internals =====

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every mutation is fsynced before returning.
    fn write(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut opts = WriteOptions::default();
        opts.set_sync(true);
        self.db.write_opt(batch, &opts)?;
        Ok(())
    }

    fn validate_embedding(&self, embedding: &[f32]) -> Result<(), StorageError> {
        if embedding.len() != self.dimension {
            return Err(StorageError::InvalidRecord(format!(
                "embedding has {} components, store expects {}",
                embedding.len(),
                self.dimension
            )));
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(StorageError::InvalidRecord(
                "embedding contains non-finite values".to_string(),
            ));
        }
        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
            return Err(StorageError::InvalidRecord(format!(
                "embedding norm {norm} is not 1"
            )));
        }
        Ok(())
    }

    fn id_taken(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.db.get_cf(self.cf(CF_RECORDS)?, id.as_bytes())?.is_some()
            || self.db.get_cf(self.cf(CF_TOMBSTONES)?, id.as_bytes())?.is_some())
    }

    fn unused_id(&self) -> Result<String, StorageError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = new_record_id();
            if !self.id_taken(&id)? {
                return Ok(id);
            }
            warn!(id = %id, "Generated id already used, drawing another");
        }
        Err(StorageError::IdExhausted(MAX_ID_ATTEMPTS))
    }

    /// Exact id first, then prefix match. Several prefix matches resolve to
    /// the most recently created one.
    fn resolve(&self, id_or_prefix: &str) -> Result<Option<MemoryRecord>, StorageError> {
        let Some(key) = normalize_lookup(id_or_prefix) else {
            return Ok(None);
        };

        if let Some(bytes) = self.db.get_cf(self.cf(CF_RECORDS)?, key.as_bytes())? {
            return Ok(Some(MemoryRecord::from_bytes(&bytes)?));
        }

        let matches = self.records_with_prefix(&key)?;
        if matches.len() > 1 {
            warn!(
                prefix = %key,
                matches = matches.len(),
                "Ambiguous short id, using the most recent record"
            );
        }
        Ok(matches.into_iter().min_by(newest_first))
    }

    fn records_with_prefix(&self, prefix: &str) -> Result<Vec<MemoryRecord>, StorageError> {
        let prefix = prefix.as_bytes();
        let mut results = Vec::new();
        let iter = self.db.iterator_cf(
            self.cf(CF_RECORDS)?,
            IteratorMode::From(prefix, Direction::Forward),
        );

        for item in iter {
            let (key, value) = item?;
            // Stop if we've passed the prefix
            if !key.starts_with(prefix) {
                break;
            }
            results.push(MemoryRecord::from_bytes(&value)?);
        }

        Ok(results)
    }

    fn count_cf_entries(&self, cf: &ColumnFamily) -> Result<usize, StorageError> {
        let mut count = 0usize;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn get_disk_usage(&self) -> u64 {
        std::fs::read_dir(&self.path)
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|entry| entry.metadata().ok())
                    .map(|metadata| metadata.len())
                    .sum()
            })
            .unwrap_or(0)
    }
}

/// Non-finite floats serialize as `null`, which cannot be read back.
fn validate_metadata(metadata: &MetadataMap) -> Result<(), StorageError> {
    for (key, value) in metadata {
        if let MetadataValue::Float(f) = value {
            if !f.is_finite() {
                return Err(StorageError::InvalidRecord(format!(
                    "metadata field {key} is not a finite number: {f}"
                )));
            }
        }
    }
    Ok(())
}

impl Drop for RecordStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "Failed to flush record store on close");
        }
    }
}

/// Statistics about the storage.
#[derive(Debug, Default, Clone)]
pub struct StorageStats {
    /// Number of live records
    pub record_count: usize,
    /// Number of deleted ids kept to prevent reuse
    pub tombstone_count: usize,
    /// Embedding dimension of the store
    pub dimension: usize,
    /// Total disk usage in bytes
    pub disk_usage_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_types::CREATED_AT_KEY;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const DIM: usize = 4;

    fn create_test_store() -> (RecordStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::open(temp_dir.path(), DIM).unwrap();
        (store, temp_dir)
    }

    fn unit(hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        v[hot % DIM] = 1.0;
        v
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, day, 12, 0, 0).unwrap()
    }

    fn record_with_id(id: &str, created_at: &str) -> MemoryRecord {
        let mut extra = MetadataMap::new();
        extra.insert(CREATED_AT_KEY.to_string(), created_at.into());
        MemoryRecord {
            id: id.to_string(),
            text: format!("note {id}"),
            embedding: unit(0),
            metadata: Metadata::stamped(extra, Utc::now()),
        }
    }

    fn padded(prefix: &str) -> String {
        format!("{prefix:0<32}")
    }

    #[test]
    fn test_open_creates_column_families() {
        let (store, _temp) = create_test_store();
        for cf_name in ALL_CF_NAMES {
            assert!(
                store.db.cf_handle(cf_name).is_some(),
                "CF {} should exist",
                cf_name
            );
        }
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_insert_and_get() {
        let (store, _temp) = create_test_store();
        let mut meta = MetadataMap::new();
        meta.insert("category".to_string(), "travel".into());

        let record = store
            .insert("passport in blue suitcase", unit(1), meta, at(13))
            .unwrap();
        assert_eq!(record.id.len(), RECORD_ID_LEN);
        assert_eq!(record.created_at(), Some(at(13)));

        let fetched = store.get(&record.id).unwrap().unwrap();
        assert_eq!(fetched, record);
        assert_eq!(
            fetched.metadata.extra.get("category"),
            Some(&MetadataValue::Text("travel".to_string()))
        );
    }

    #[test]
    fn test_get_by_short_id_and_case() {
        let (store, _temp) = create_test_store();
        let record = store.insert("keys", unit(0), MetadataMap::new(), at(1)).unwrap();

        let by_short = store.get(record.short_id()).unwrap().unwrap();
        assert_eq!(by_short.id, record.id);

        let upper = record.short_id().to_ascii_uppercase();
        assert_eq!(store.get(&upper).unwrap().unwrap().id, record.id);
    }

    #[test]
    fn test_get_missing() {
        let (store, _temp) = create_test_store();
        store.insert("keys", unit(0), MetadataMap::new(), at(1)).unwrap();
        assert!(store.get(&padded("9999")).unwrap().is_none());
        assert!(store.get("").unwrap().is_none());
        assert!(store.get("not-hex").unwrap().is_none());
    }

    #[test]
    fn test_insert_rejects_bad_embeddings() {
        let (store, _temp) = create_test_store();
        let wrong_dim = vec![1.0, 0.0];
        assert!(matches!(
            store.insert("x", wrong_dim, MetadataMap::new(), at(1)),
            Err(StorageError::InvalidRecord(_))
        ));
        let not_unit = vec![1.0, 1.0, 0.0, 0.0];
        assert!(store.insert("x", not_unit, MetadataMap::new(), at(1)).is_err());
        let nan = vec![f32::NAN, 0.0, 0.0, 0.0];
        assert!(store.insert("x", nan, MetadataMap::new(), at(1)).is_err());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_ambiguous_prefix_resolves_to_most_recent() {
        let (store, _temp) = create_test_store();
        let older = record_with_id(&padded("abcd1"), "2025-01-01T00:00:00Z");
        let newer = record_with_id(&padded("abcd2"), "2025-06-01T00:00:00Z");
        let other = record_with_id(&padded("ffff"), "2025-12-01T00:00:00Z");
        for r in [&older, &newer, &other] {
            assert!(store.insert_record(r).unwrap());
        }

        assert_eq!(store.matching_ids("abcd").unwrap().len(), 2);
        assert_eq!(store.get("abcd").unwrap().unwrap().id, newer.id);
        assert_eq!(store.get("abcd1").unwrap().unwrap().id, older.id);
    }

    #[test]
    fn test_ambiguous_prefix_tie_and_undated() {
        let (store, _temp) = create_test_store();
        let a = record_with_id(&padded("12a"), "2025-01-01T00:00:00Z");
        let b = record_with_id(&padded("12b"), "2025-01-01T00:00:00Z");
        let undated = record_with_id(&padded("12c"), "sometime");
        for r in [&b, &undated, &a] {
            assert!(store.insert_record(r).unwrap());
        }
        assert_eq!(store.get("12").unwrap().unwrap().id, a.id);
    }

    #[test]
    fn test_delete_tombstones_id() {
        let (store, _temp) = create_test_store();
        let record = record_with_id(&padded("beef"), "2025-01-01T00:00:00Z");
        assert!(store.insert_record(&record).unwrap());

        assert!(store.delete("beef").unwrap());
        assert!(!store.delete("beef").unwrap());
        assert!(store.get(&record.id).unwrap().is_none());

        // A deleted id is never reused.
        assert!(!store.insert_record(&record).unwrap());
        assert_eq!(store.get_stats().unwrap().tombstone_count, 1);
    }

    #[test]
    fn test_non_finite_metadata_rejected() {
        let (store, _temp) = create_test_store();
        store.insert("kept", unit(0), MetadataMap::new(), at(1)).unwrap();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut meta = MetadataMap::new();
            meta.insert("weight".to_string(), MetadataValue::Float(bad));
            assert!(matches!(
                store.insert("bad", unit(1), meta.clone(), at(2)),
                Err(StorageError::InvalidRecord(_))
            ));

            let mut record = record_with_id(&padded("beef"), "2025-01-01T00:00:00Z");
            record.metadata.extra = meta;
            assert!(matches!(
                store.insert_record(&record),
                Err(StorageError::InvalidRecord(_))
            ));
        }

        let mut finite = MetadataMap::new();
        finite.insert("weight".to_string(), MetadataValue::Float(2.5));
        store.insert("fine", unit(2), finite, at(3)).unwrap();

        let all = store.all_records().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.list(None).unwrap()[0].text, "fine");
    }

    #[test]
    fn test_insert_record_rejects_malformed_id() {
        let (store, _temp) = create_test_store();
        let record = record_with_id("ABCD", "2025-01-01T00:00:00Z");
        assert!(store.insert_record(&record).is_err());
    }

    #[test]
    fn test_list_newest_first_with_limit() {
        let (store, _temp) = create_test_store();
        for day in [3, 1, 5, 2, 4] {
            store
                .insert(&format!("day {day}"), unit(day as usize), MetadataMap::new(), at(day))
                .unwrap();
        }

        let all = store.list(None).unwrap();
        let texts: Vec<&str> = all.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["day 5", "day 4", "day 3", "day 2", "day 1"]);

        let top = store.list(Some(2)).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].text, "day 5");
        assert_eq!(store.latest().unwrap().unwrap().text, "day 5");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (store, _temp) = create_test_store();
        for i in 0..3 {
            store.insert("n", unit(i), MetadataMap::new(), at(1)).unwrap();
        }
        assert_eq!(store.clear().unwrap(), 3);
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.clear().unwrap(), 0);
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.latest().unwrap().is_none());
    }

    #[test]
    fn test_persistence_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let id = {
            let store = RecordStore::open(temp_dir.path(), DIM).unwrap();
            store
                .insert("keys in jacket", unit(2), MetadataMap::new(), at(7))
                .unwrap()
                .id
        };

        let store = RecordStore::open(temp_dir.path(), DIM).unwrap();
        let record = store.get(&id).unwrap().unwrap();
        assert_eq!(record.text, "keys in jacket");
        assert_eq!(record.embedding, unit(2));
        assert_eq!(record.created_at(), Some(at(7)));
    }

    #[test]
    fn test_reopen_with_other_dimension_fails() {
        let temp_dir = TempDir::new().unwrap();
        drop(RecordStore::open(temp_dir.path(), DIM).unwrap());

        let err = RecordStore::open(temp_dir.path(), DIM * 2).err().unwrap();
        assert!(matches!(
            err,
            StorageError::DimensionMismatch { stored: DIM, requested } if requested == DIM * 2
        ));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let temp_dir = TempDir::new().unwrap();
        assert!(RecordStore::open(temp_dir.path(), 0).is_err());
    }

    #[test]
    fn test_stats() {
        let (store, _temp) = create_test_store();
        store.insert("a", unit(0), MetadataMap::new(), at(1)).unwrap();
        let stats = store.get_stats().unwrap();
        assert_eq!(stats.record_count, 1);
        assert_eq!(stats.dimension, DIM);
    }
}
