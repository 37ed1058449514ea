//! Column family definitions for RocksDB.
//!
//! - records: id -> JSON record (Zstd compressed)
//! - tombstones: ids of deleted records, kept so ids are never reissued
//! - meta: store-level settings such as the embedding dimension

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for live records
pub const CF_RECORDS: &str = "records";

/// Column family name for deleted-id markers
pub const CF_TOMBSTONES: &str = "tombstones";

/// Column family name for store metadata
pub const CF_META: &str = "meta";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_RECORDS, CF_TOMBSTONES, CF_META];

/// Records carry an embedding of a few hundred floats each; compress them.
fn records_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_RECORDS, records_options()),
        ColumnFamilyDescriptor::new(CF_TOMBSTONES, Options::default()),
        ColumnFamilyDescriptor::new(CF_META, Options::default()),
    ]
}
