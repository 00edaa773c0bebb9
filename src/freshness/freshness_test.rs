// Tests for the freshness classifier.

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::time::Duration;

use super::{cache_age, classify, FreshnessState, Thresholds};
use crate::model::{CachedRow, EntityType, MetricsPayload};

fn thresholds() -> Thresholds {
    Thresholds::new(Duration::from_secs(15 * 60), Duration::from_secs(6 * 3600))
}

fn row(day: u32, age: ChronoDuration) -> CachedRow {
    CachedRow {
        customer_id: "123".into(),
        entity_type: EntityType::Campaign,
        entity_id: "c-1".into(),
        parent_entity_id: None,
        date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
        synced_at: Utc::now() - age,
        metrics: MetricsPayload::default(),
    }
}

fn rows(count: u32, age: ChronoDuration) -> Vec<CachedRow> {
    (1..=count).map(|d| row(d, age)).collect()
}

#[test]
fn test_missing_when_no_rows_match() {
    let state = classify(&[], 7, Utc::now(), thresholds());
    assert_eq!(state, FreshnessState::Missing);
}

#[test]
fn test_fresh_when_young_and_covered() {
    let state = classify(&rows(7, ChronoDuration::minutes(1)), 7, Utc::now(), thresholds());
    assert_eq!(state, FreshnessState::Fresh);
    assert!(state.is_servable());
}

#[test]
fn test_stale_between_thresholds() {
    let state = classify(&rows(7, ChronoDuration::hours(1)), 7, Utc::now(), thresholds());
    assert_eq!(state, FreshnessState::Stale);
    assert!(state.is_servable());
}

#[test]
fn test_expired_past_stale_threshold() {
    let state = classify(&rows(7, ChronoDuration::hours(7)), 7, Utc::now(), thresholds());
    assert_eq!(state, FreshnessState::Expired);
    assert!(!state.is_servable());
}

#[test]
fn test_incomplete_coverage_overrides_freshness() {
    // 5 of 7 expected days, all one minute old: still expired.
    let state = classify(&rows(5, ChronoDuration::minutes(1)), 7, Utc::now(), thresholds());
    assert_eq!(state, FreshnessState::Expired);
}

#[test]
fn test_oldest_row_decides_the_age() {
    let mut mixed = rows(6, ChronoDuration::minutes(1));
    mixed.push(row(7, ChronoDuration::hours(1)));
    let state = classify(&mixed, 7, Utc::now(), thresholds());
    assert_eq!(state, FreshnessState::Stale);
}

#[test]
fn test_cache_age_of_oldest_row() {
    let mut mixed = rows(2, ChronoDuration::minutes(1));
    mixed.push(row(3, ChronoDuration::minutes(30)));
    let age = cache_age(&mixed, Utc::now()).unwrap();
    assert!(age >= Duration::from_secs(29 * 60));
    assert!(age < Duration::from_secs(31 * 60));
}

#[test]
fn test_future_synced_at_counts_as_zero_age() {
    let fresh_future = vec![row(1, ChronoDuration::minutes(-5))];
    let state = classify(&fresh_future, 1, Utc::now(), thresholds());
    assert_eq!(state, FreshnessState::Fresh);
}
