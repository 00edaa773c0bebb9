// Package inspector provides read-only per-key diagnostics.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::freshness::{self, FreshnessState, Thresholds};
use crate::model::{CacheKey, JobLogEntry};
use crate::registry::LockBackoffRegistry;
use crate::store::{CacheStore, JobLogStore, StoreError};

/// Everything an operator needs to know about one cache key.
#[derive(Debug, Clone, Serialize)]
pub struct KeyReport {
    pub key: String,
    pub exists: bool,
    pub row_count: usize,
    pub expected_coverage: usize,
    pub age_secs: Option<u64>,
    pub state: FreshnessState,
    pub refresh_running: bool,
    pub in_backoff: bool,
    pub last_refresh_job: Option<JobLogEntry>,
}

/// Joins the store, registry and job history into point lookups.
/// Purely diagnostic; mutates nothing.
pub struct Inspector {
    store: Arc<dyn CacheStore>,
    registry: Arc<LockBackoffRegistry>,
    job_log: Arc<dyn JobLogStore>,
    thresholds: Thresholds,
}

impl Inspector {
    pub fn new(
        store: Arc<dyn CacheStore>,
        registry: Arc<LockBackoffRegistry>,
        job_log: Arc<dyn JobLogStore>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            store,
            registry,
            job_log,
            thresholds,
        }
    }

    pub async fn inspect(&self, key: &CacheKey) -> Result<KeyReport, StoreError> {
        let now = Utc::now();
        let rows = self.store.find_rows(key).await?;
        let expected = key.expected_coverage();
        let age = freshness::cache_age(&rows, now);
        let state = freshness::classify(&rows, expected, now, self.thresholds);

        let last_refresh_job = self
            .job_log
            .query_recent(1, Some(&key.customer_id))
            .await?
            .into_iter()
            .next();

        Ok(KeyReport {
            key: key.to_string(),
            exists: !rows.is_empty(),
            row_count: rows.len(),
            expected_coverage: expected,
            age_secs: age.map(|a| a.as_secs()),
            state,
            refresh_running: self.registry.is_locked(key),
            in_backoff: self.registry.is_in_backoff(key),
            last_refresh_job,
        })
    }
}
