//! Error path tests.
//!
//! Invalid input is rejected with a typed error and leaves the store
//! untouched. No test should cause a panic inside the engine.

use chrono::Utc;
use pretty_assertions::assert_eq;

use brain_service::EngineError;
use brain_storage::StorageError;
use brain_types::{MetadataMap, MetadataValue};
use e2e_tests::{build_record, TestHarness};

#[test]
fn test_blank_text_is_rejected() {
    let harness = TestHarness::new();
    for text in ["", "   ", "\n\t"] {
        assert!(matches!(
            harness.engine.add(text),
            Err(EngineError::EmptyInput(_))
        ));
    }
    assert_eq!(harness.engine.count().unwrap(), 0);
}

#[test]
fn test_blank_query_is_rejected_even_on_empty_store() {
    let harness = TestHarness::new();
    assert!(matches!(
        harness.engine.recall("  ", 10, 3, 0.5, Utc::now()),
        Err(EngineError::EmptyInput(_))
    ));
}

#[test]
fn test_out_of_range_threshold_is_rejected() {
    let harness = TestHarness::new();
    harness.engine.add("a note").unwrap();
    for threshold in [-0.1, 1.01, f64::NAN] {
        let result = harness.engine.recall("a note", 10, 3, threshold, Utc::now());
        assert!(
            matches!(result, Err(EngineError::InvalidArgument(_))),
            "threshold {threshold} gave {result:?}"
        );
    }
}

#[test]
fn test_import_rejects_malformed_records() {
    let harness = TestHarness::new();
    let embedder = harness.engine.embedder().clone();

    let bad_id = build_record(embedder.as_ref(), "not-a-hex-id", "text", None);
    assert!(matches!(
        harness.store().insert_record(&bad_id),
        Err(StorageError::InvalidRecord(_))
    ));

    let upper = build_record(embedder.as_ref(), &"A".repeat(32), "text", None);
    assert!(matches!(
        harness.store().insert_record(&upper),
        Err(StorageError::InvalidRecord(_))
    ));

    let mut short_vec = build_record(embedder.as_ref(), &"1".repeat(32), "text", None);
    short_vec.embedding.truncate(3);
    assert!(harness.store().insert_record(&short_vec).is_err());

    let mut unnormalized = build_record(embedder.as_ref(), &"2".repeat(32), "text", None);
    for v in &mut unnormalized.embedding {
        *v *= 3.0;
    }
    assert!(harness.store().insert_record(&unnormalized).is_err());

    assert_eq!(harness.engine.count().unwrap(), 0);
}

#[test]
fn test_duplicate_import_is_skipped() {
    let harness = TestHarness::new();
    let record = harness.import(&"3".repeat(32), "only once", None);
    assert!(!harness.store().insert_record(&record).unwrap());
    assert_eq!(harness.engine.count().unwrap(), 1);
}

#[test]
fn test_non_finite_metadata_is_rejected_and_store_stays_readable() {
    let harness = TestHarness::new();
    harness.engine.add("passport in blue suitcase").unwrap();

    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let mut metadata = MetadataMap::new();
        metadata.insert("weight".to_string(), MetadataValue::Float(bad));
        assert!(matches!(
            harness.engine.add_with_metadata("heavy box", metadata),
            Err(EngineError::Storage(StorageError::InvalidRecord(_)))
        ));
    }

    assert_eq!(harness.engine.count().unwrap(), 1);
    assert_eq!(harness.engine.list(None, None, Utc::now()).unwrap().len(), 1);
    let results = harness
        .engine
        .recall("passport in blue suitcase", 10, 3, 0.0, Utc::now())
        .unwrap();
    assert_eq!(results[0].record.text, "passport in blue suitcase");
    assert!(harness.engine.stats().is_ok());
}
