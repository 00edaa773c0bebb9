// Package freshness classifies cached rows by age and coverage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::CachedRow;

#[cfg(test)]
mod freshness_test;

/// Derived cache state, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessState {
    Fresh,
    Stale,
    Expired,
    Missing,
}

impl FreshnessState {
    /// Whether the cached value may be served to the caller right now.
    pub fn is_servable(&self) -> bool {
        matches!(self, FreshnessState::Fresh | FreshnessState::Stale)
    }
}

/// Age thresholds; `fresh` must be strictly below `stale`.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub fresh: Duration,
    pub stale: Duration,
}

impl Thresholds {
    pub fn new(fresh: Duration, stale: Duration) -> Self {
        Self { fresh, stale }
    }
}

/// Age of the oldest synced row, or None when no rows matched.
pub fn cache_age(rows: &[CachedRow], now: DateTime<Utc>) -> Option<Duration> {
    rows.iter()
        .map(|r| r.synced_at)
        .min()
        .map(|oldest| (now - oldest).to_std().unwrap_or(Duration::ZERO))
}

/// Classifies the cache state for a key from the rows that matched it.
///
/// Pure function of its inputs: no rows means Missing; incomplete coverage
/// means Expired regardless of age (partial data is never served as fresh);
/// otherwise the age of the oldest row decides it.
pub fn classify(
    rows: &[CachedRow],
    expected_coverage: usize,
    now: DateTime<Utc>,
    thresholds: Thresholds,
) -> FreshnessState {
    let Some(age) = cache_age(rows, now) else {
        return FreshnessState::Missing;
    };

    if rows.len() < expected_coverage {
        return FreshnessState::Expired;
    }

    if age < thresholds.fresh {
        FreshnessState::Fresh
    } else if age < thresholds.stale {
        FreshnessState::Stale
    } else {
        FreshnessState::Expired
    }
}
