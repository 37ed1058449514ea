//! Record ids and lookup keys.
//!
//! Ids are 128 random bits rendered as 32 lowercase hex characters. Records
//! are keyed by the raw id bytes, so a short id is simply a key prefix and
//! resolves with a forward prefix scan.

use crate::error::StorageError;

/// Length of a full record id.
pub const RECORD_ID_LEN: usize = 32;

/// Key under which the embedding dimension is stored in the meta column family.
pub const META_DIMENSION_KEY: &[u8] = b"embedding_dimension";

/// Draw a fresh random id.
pub fn new_record_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Normalize user input for id lookup.
///
/// Returns `None` for input that cannot match any id: empty, longer than a
/// full id, or containing non-hex characters.
pub fn normalize_lookup(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty()
        || trimmed.len() > RECORD_ID_LEN
        || !trimmed.chars().all(|c| c.is_ascii_hexdigit())
    {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}

/// Encode the embedding dimension for the meta column family.
pub fn encode_dimension(dimension: usize) -> Vec<u8> {
    (dimension as u64).to_be_bytes().to_vec()
}

/// Decode a stored embedding dimension.
pub fn decode_dimension(bytes: &[u8]) -> Result<usize, StorageError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        StorageError::Serialization(format!("Invalid dimension entry of {} bytes", bytes.len()))
    })?;
    Ok(u64::from_be_bytes(raw) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_id_format() {
        let id = new_record_id();
        assert_eq!(id.len(), RECORD_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_new_record_ids_differ() {
        assert_ne!(new_record_id(), new_record_id());
    }

    #[test]
    fn test_normalize_lookup() {
        assert_eq!(normalize_lookup(" A3F2 "), Some("a3f2".to_string()));
        assert_eq!(normalize_lookup(""), None);
        assert_eq!(normalize_lookup("   "), None);
        assert_eq!(normalize_lookup("xyz"), None);
        assert_eq!(normalize_lookup(&"a".repeat(RECORD_ID_LEN + 1)), None);
    }

    #[test]
    fn test_dimension_encoding() {
        assert_eq!(decode_dimension(&encode_dimension(384)).unwrap(), 384);
        assert!(decode_dimension(b"abc").is_err());
    }
}
