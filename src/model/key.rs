// Package model provides cache key building and normalization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity kinds the upstream advertising API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Campaign,
    AdGroup,
    Ad,
    Keyword,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Campaign => "campaign",
            EntityType::AdGroup => "adgroup",
            EntityType::Ad => "ad",
            EntityType::Keyword => "keyword",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of calendar days covered, inclusive on both ends.
    pub fn days(&self) -> usize {
        if self.end < self.start {
            return 0;
        }
        (self.end - self.start).num_days() as usize + 1
    }

    /// Iterates over every date in the range.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.days())
    }
}

/// Normalized identity used for freshness lookups, locks and backoffs.
///
/// Two requests with identical parameters always map to the identical key;
/// the normalized `Display` form is what shows up in logs and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CacheKey {
    pub customer_id: String,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub parent_entity_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl CacheKey {
    /// Builds a key covering a whole entity type over a date range.
    pub fn ranged(customer_id: impl Into<String>, entity_type: EntityType, range: DateRange) -> Self {
        Self {
            customer_id: customer_id.into(),
            entity_type,
            entity_id: None,
            parent_entity_id: None,
            start_date: Some(range.start),
            end_date: Some(range.end),
        }
    }

    /// Builds a point-lookup key for a single entity without a date range.
    pub fn point(
        customer_id: impl Into<String>,
        entity_type: EntityType,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            entity_type,
            entity_id: Some(entity_id.into()),
            parent_entity_id: None,
            start_date: None,
            end_date: None,
        }
    }

    /// The key's date range when both ends are present.
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            _ => None,
        }
    }

    /// Number of calendar days a complete cache fill must cover.
    /// Point lookups expect exactly one row.
    pub fn expected_coverage(&self) -> usize {
        self.date_range().map(|r| r.days()).unwrap_or(1).max(1)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Normalized form: dates in ISO format, absent parts as "-".
        write!(
            f,
            "{}:{}:{}:{}:{}:{}",
            self.customer_id,
            self.entity_type,
            self.entity_id.as_deref().unwrap_or("-"),
            self.parent_entity_id.as_deref().unwrap_or("-"),
            self.start_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            self.end_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        )
    }
}
