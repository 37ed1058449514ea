//! Memory record type.
//!
//! A record is an immutable note: its text, the embedding computed from that
//! text at creation time, and a metadata map that always carries the creation
//! timestamp. Records are never edited in place; an update is a new record.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Number of leading id characters shown to users and accepted as lookup keys.
pub const SHORT_ID_LEN: usize = 4;

/// Metadata key that carries the creation timestamp.
pub const CREATED_AT_KEY: &str = "created_at";

/// Accepted deviation of an embedding's Euclidean norm from 1.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-3;

/// Scalar metadata value.
///
/// Variant order matters for untagged deserialization: booleans and integers
/// must be tried before floats and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// Open string-keyed scalar mapping supplied by callers.
pub type MetadataMap = BTreeMap<String, MetadataValue>;

/// Record metadata: the required creation timestamp plus open extra fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Creation timestamp as persisted (RFC 3339 for records written by this
    /// crate). Kept as the raw string so that legacy or hand-edited values
    /// survive a round trip; use [`Metadata::created_at`] to interpret it.
    #[serde(default)]
    pub created_at: String,

    /// Additional caller-supplied fields.
    #[serde(flatten)]
    pub extra: MetadataMap,
}

impl Metadata {
    /// Build metadata from caller fields, stamping `now` as the creation time
    /// unless the caller already supplied a textual `created_at`.
    pub fn stamped(mut extra: MetadataMap, now: DateTime<Utc>) -> Self {
        // A non-string `created_at` cannot be a timestamp and is replaced.
        let created_at = match extra.remove(CREATED_AT_KEY) {
            Some(MetadataValue::Text(ts)) => ts,
            _ => format_timestamp(now),
        };
        Self { created_at, extra }
    }

    /// Parsed creation timestamp, or `None` if missing or unparsable.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

/// A stored note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// 32 lowercase hex characters (128 random bits)
    pub id: String,
    /// The note, exactly as given
    pub text: String,
    /// Unit-length embedding of `text`
    pub embedding: Vec<f32>,
    /// Creation timestamp and extra fields
    pub metadata: Metadata,
}

impl MemoryRecord {
    /// Display form of the id.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    /// Parsed creation timestamp, or `None` if missing or unparsable.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.metadata.created_at()
    }

    /// Serialize to JSON bytes for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// First [`SHORT_ID_LEN`] characters of an id (the whole id if shorter).
pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Newest-first ordering of records.
///
/// Records with a missing or unparsable timestamp sort after every dated
/// record. Equal timestamps fall back to ascending id, so the order is total.
pub fn newest_first(a: &MemoryRecord, b: &MemoryRecord) -> Ordering {
    match (a.created_at(), b.created_at()) {
        (Some(ta), Some(tb)) => tb.cmp(&ta),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}

/// Render a timestamp the way records persist it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a persisted timestamp.
///
/// Accepts RFC 3339 and naive ISO-8601 (`YYYY-MM-DDTHH:MM:SS[.f]`), the
/// latter interpreted as UTC. Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> MemoryRecord {
        let now = Utc.with_ymd_and_hms(2025, 10, 13, 20, 32, 0).unwrap();
        let mut extra = MetadataMap::new();
        extra.insert("category".to_string(), "travel".into());
        extra.insert("pinned".to_string(), true.into());
        MemoryRecord {
            id: "a3f2c0ffee0000000000000000000001".to_string(),
            text: "passport in blue suitcase".to_string(),
            embedding: vec![0.6, 0.8],
            metadata: Metadata::stamped(extra, now),
        }
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("a3f2c0ffee"), "a3f2");
        assert_eq!(short_id("ab"), "ab");
        assert_eq!(sample_record().short_id(), "a3f2");
    }

    #[test]
    fn test_stamped_sets_created_at() {
        let record = sample_record();
        assert_eq!(record.metadata.created_at, "2025-10-13T20:32:00.000000Z");
        assert_eq!(
            record.created_at(),
            Some(Utc.with_ymd_and_hms(2025, 10, 13, 20, 32, 0).unwrap())
        );
    }

    #[test]
    fn test_stamped_keeps_caller_timestamp() {
        let mut extra = MetadataMap::new();
        extra.insert(CREATED_AT_KEY.to_string(), "2024-01-01T00:00:00Z".into());
        let meta = Metadata::stamped(extra, Utc::now());
        assert_eq!(meta.created_at, "2024-01-01T00:00:00Z");
        assert!(meta.extra.is_empty());
    }

    #[test]
    fn test_stamped_replaces_non_text_created_at() {
        let mut extra = MetadataMap::new();
        extra.insert(CREATED_AT_KEY.to_string(), 42i64.into());
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let meta = Metadata::stamped(extra, now);
        assert_eq!(meta.created_at(), Some(now));
        assert!(!meta.extra.contains_key(CREATED_AT_KEY));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 10, 13, 20, 32, 0).unwrap();
        assert_eq!(parse_timestamp("2025-10-13T20:32:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-13T22:32:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-13T20:32:00"), Some(expected));
        assert!(parse_timestamp("2025-10-13T20:32:00.123456").is_some());
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("last tuesday"), None);
    }

    #[test]
    fn test_record_json_roundtrip() {
        let record = sample_record();
        let bytes = record.to_bytes().unwrap();
        let decoded = MemoryRecord::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(
            decoded.metadata.extra.get("pinned"),
            Some(&MetadataValue::Bool(true))
        );
    }

    #[test]
    fn test_newest_first_ordering() {
        let mut old = sample_record();
        old.id = "bbbb".to_string();
        old.metadata.created_at = "2024-01-01T00:00:00Z".to_string();
        let mut new = sample_record();
        new.id = "cccc".to_string();
        let mut twin = new.clone();
        twin.id = "aaaa".to_string();
        let mut undated = sample_record();
        undated.id = "0000".to_string();
        undated.metadata.created_at = "garbage".to_string();

        let mut records = vec![undated, old, new, twin];
        records.sort_by(newest_first);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["aaaa", "cccc", "bbbb", "0000"]);
    }

    #[test]
    fn test_missing_created_at_deserializes_as_unknown() {
        let json = r#"{"id":"abcd","text":"t","embedding":[1.0],"metadata":{"source":"import"}}"#;
        let record = MemoryRecord::from_bytes(json.as_bytes()).unwrap();
        assert_eq!(record.created_at(), None);
        assert_eq!(
            record.metadata.extra.get("source"),
            Some(&MetadataValue::Text("import".to_string()))
        );
    }
}
