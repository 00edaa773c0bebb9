// Common test fixtures.

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::Config;
use crate::model::{CacheKey, CachedRow, DateRange, EntityType, MetricsPayload};

/// Config with short windows so tests run in milliseconds.
pub fn test_config() -> Config {
    let yaml = r#"
adsync:
  env: test
  freshness:
    fresh_threshold: 200ms
    stale_threshold: 1m
  locks:
    ttl: 5s
    contention_wait: 500ms
    poll_interval: 20ms
  backoff:
    fallback: 500ms
    error_cooldown: 200ms
  dispatch:
    fetch_timeout: 2s
    max_background_tasks: 8
  queue:
    workers: 1
    rate_limit_per_sec: 50
    heartbeat_interval: 100ms
  auth:
    operator_token: test-operator
"#;
    serde_yaml::from_str(yaml).expect("test config must parse")
}

pub fn week_range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 7).unwrap(),
    )
}

pub fn week_key(customer_id: &str) -> CacheKey {
    CacheKey::ranged(customer_id, EntityType::Campaign, week_range())
}

/// One row per day over the range, synced at the given instant.
pub fn rows_for(
    customer_id: &str,
    entity_type: EntityType,
    range: DateRange,
    synced_at: DateTime<Utc>,
) -> Vec<CachedRow> {
    range
        .iter_days()
        .map(|date| CachedRow {
            customer_id: customer_id.to_string(),
            entity_type,
            entity_id: format!("{}-1", entity_type),
            parent_entity_id: None,
            date,
            synced_at,
            metrics: MetricsPayload {
                impressions: 1000,
                clicks: 50,
                cost_micros: 12_000,
                conversions: 2.5,
            },
        })
        .collect()
}
