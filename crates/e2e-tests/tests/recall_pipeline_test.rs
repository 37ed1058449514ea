//! Add-then-recall pipeline tests.
//!
//! Exercises the full path: text -> embedder -> record store -> flat
//! similarity search -> hybrid ranking.

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

use brain_service::Listing;
use brain_types::Settings;
use e2e_tests::{random_notes, TestHarness};

fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 13, 12, 0, 0).unwrap()
}

#[test]
fn test_add_then_get_round_trip() {
    let harness = TestHarness::new();
    let text = "  Passport is in the BLUE suitcase\n";
    let record = harness.engine.add(text).unwrap();

    let fetched = harness.engine.get(&record.id).unwrap().unwrap();
    assert_eq!(fetched.text, text);
    assert_eq!(fetched, record);

    let by_short = harness.engine.get(record.short_id()).unwrap().unwrap();
    assert_eq!(by_short.id, record.id);
}

#[test]
fn test_exact_text_recalls_first_with_high_similarity() {
    let harness = TestHarness::new();
    for note in [
        "dentist appointment on friday at 3pm",
        "passport is in the blue suitcase",
        "wifi password is on the fridge",
        "mom's birthday is march 3rd",
    ] {
        harness.engine.add(note).unwrap();
    }

    let results = harness
        .engine
        .recall("passport is in the blue suitcase", 10, 3, 0.0, Utc::now())
        .unwrap();

    assert_eq!(results[0].record.text, "passport is in the blue suitcase");
    assert!(
        results[0].scores.similarity > 0.95,
        "similarity was {}",
        results[0].scores.similarity
    );
}

#[test]
fn test_recall_is_deterministic() {
    let harness = TestHarness::new();
    for note in random_notes(25) {
        harness.add_at(&note, fixed_now() - Duration::hours(3));
    }

    let first = harness
        .engine
        .recall("passport and keys", 10, 5, 0.0, fixed_now())
        .unwrap();
    let second = harness
        .engine
        .recall("passport and keys", 10, 5, 0.0, fixed_now())
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_scores_stay_in_unit_interval_and_descend() {
    let harness = TestHarness::new();
    for (i, note) in random_notes(30).iter().enumerate() {
        harness.add_at(note, fixed_now() - Duration::days(i as i64 * 11));
    }

    let results = harness
        .engine
        .recall("coffee at the bank", 30, 30, 0.0, fixed_now())
        .unwrap();
    assert_eq!(results.len(), 30);

    for result in &results {
        let s = result.scores;
        assert!((0.0..=1.0).contains(&s.similarity), "{s:?}");
        assert!((0.0..=1.0).contains(&s.recency), "{s:?}");
        assert!((0.0..=1.0).contains(&s.final_score), "{s:?}");
        assert!((0.0..=2.0 + 1e-5).contains(&s.distance), "{s:?}");
    }
    for pair in results.windows(2) {
        assert!(pair[0].score() >= pair[1].score());
    }
}

#[test]
fn test_newer_copy_outranks_older_copy() {
    let harness = TestHarness::new();
    let old = harness.add_at("car keys in the drawer", fixed_now() - Duration::days(60));
    let new = harness.add_at("car keys in the drawer", fixed_now() - Duration::hours(1));

    let results = harness
        .engine
        .recall("car keys in the drawer", 10, 2, 0.0, fixed_now())
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].record.id, new.id);
    assert_eq!(results[1].record.id, old.id);
    assert!(results[0].scores.recency > results[1].scores.recency);
    assert!((results[0].scores.similarity - results[1].scores.similarity).abs() < 1e-9);
}

#[test]
fn test_limit_three_of_ten() {
    let harness = TestHarness::new();
    for i in 0..10 {
        harness
            .engine
            .add(&format!("shopping list entry {i}"))
            .unwrap();
    }
    let results = harness
        .engine
        .recall("shopping list", 10, 3, 0.0, Utc::now())
        .unwrap();
    assert_eq!(results.len(), 3);
}

#[test]
fn test_high_threshold_returns_nothing_for_unrelated_query() {
    let harness = TestHarness::new();
    harness.engine.add("passport is in the blue suitcase").unwrap();
    harness.engine.add("dentist appointment friday").unwrap();

    let results = harness
        .engine
        .recall("volcanic geology lecture", 10, 5, 0.99, Utc::now())
        .unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_empty_store_recall_and_list() {
    let harness = TestHarness::new();
    assert!(harness
        .engine
        .recall_default("anything at all", Utc::now())
        .unwrap()
        .is_empty());
    assert!(harness.engine.list(None, None, Utc::now()).unwrap().is_empty());
    assert!(harness
        .engine
        .list(Some("anything"), None, Utc::now())
        .unwrap()
        .is_empty());
}

#[test]
fn test_configured_threshold_applies_by_default() {
    let mut settings = Settings::default();
    settings.scoring.confidence_threshold = 1.0;
    let harness = TestHarness::with_settings(&settings);
    harness.add_at("exact words here", fixed_now() - Duration::days(2));

    assert!(harness
        .engine
        .recall_default("exact words here", fixed_now())
        .unwrap()
        .is_empty());
    assert_eq!(
        harness
            .engine
            .recall_with("exact words here", None, Some(0.0), fixed_now())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_list_newest_first_then_query() {
    let harness = TestHarness::new();
    harness.add_at("gym at six", fixed_now() - Duration::days(3));
    harness.add_at("book club on tuesday", fixed_now() - Duration::days(1));
    harness.add_at("garden hose leaks", fixed_now() - Duration::days(2));

    match harness.engine.list(None, None, fixed_now()).unwrap() {
        Listing::Recent(records) => {
            let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
            assert_eq!(
                texts,
                vec!["book club on tuesday", "garden hose leaks", "gym at six"]
            );
        }
        other => panic!("expected recent listing, got {other:?}"),
    }

    match harness
        .engine
        .list(Some("garden hose"), Some(1), fixed_now())
        .unwrap()
    {
        Listing::Ranked(results) => {
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].record.text, "garden hose leaks");
        }
        other => panic!("expected ranked listing, got {other:?}"),
    }
}

#[test]
fn test_undated_record_gets_neutral_recency() {
    let harness = TestHarness::new();
    harness.import(
        &e2e_tests::id_with_prefix("beef", 1),
        "legacy note without a date",
        None,
    );

    let results = harness
        .engine
        .recall("legacy note without a date", 5, 5, 0.0, fixed_now())
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].scores.recency, brain_service::NEUTRAL_RECENCY);
}
