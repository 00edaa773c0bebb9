// In-memory store implementations for local runs and tests.

use chrono::NaiveDate;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::model::{CacheKey, CachedRow, EntityType, JobLogEntry};

use super::{CacheStore, JobLogStore, StoreError};

type RowKey = (String, EntityType, String, NaiveDate);

/// Dashmap-backed cache row store, upserting on the natural key.
#[derive(Default)]
pub struct MemoryCacheStore {
    rows: DashMap<RowKey, CachedRow>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn matches(key: &CacheKey, row: &CachedRow) -> bool {
        if row.customer_id != key.customer_id || row.entity_type != key.entity_type {
            return false;
        }
        if let Some(ref entity_id) = key.entity_id {
            if &row.entity_id != entity_id {
                return false;
            }
        }
        if let Some(ref parent) = key.parent_entity_id {
            if row.parent_entity_id.as_ref() != Some(parent) {
                return false;
            }
        }
        if let Some(range) = key.date_range() {
            if row.date < range.start || row.date > range.end {
                return false;
            }
        }
        true
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn find_rows(&self, key: &CacheKey) -> Result<Vec<CachedRow>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|e| Self::matches(key, e.value()))
            .map(|e| e.value().clone())
            .collect())
    }

    async fn upsert_rows(&self, rows: &[CachedRow]) -> Result<(), StoreError> {
        for row in rows {
            self.rows.insert(row.natural_key(), row.clone());
        }
        Ok(())
    }

    async fn delete_rows(&self, key: &CacheKey) -> Result<u64, StoreError> {
        let doomed: Vec<RowKey> = self
            .rows
            .iter()
            .filter(|e| Self::matches(key, e.value()))
            .map(|e| e.key().clone())
            .collect();
        let mut removed = 0;
        for k in doomed {
            if self.rows.remove(&k).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Append-only in-memory job log.
#[derive(Default)]
pub struct MemoryJobLogStore {
    entries: Mutex<Vec<JobLogEntry>>,
}

impl MemoryJobLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl JobLogStore for MemoryJobLogStore {
    async fn append(&self, entry: JobLogEntry) -> Result<(), StoreError> {
        self.entries.lock().push(entry);
        Ok(())
    }

    async fn query_recent(
        &self,
        limit: usize,
        customer_id: Option<&str>,
    ) -> Result<Vec<JobLogEntry>, StoreError> {
        let entries = self.entries.lock();
        Ok(entries
            .iter()
            .rev()
            .filter(|e| customer_id.map(|c| e.customer_id == c).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect())
    }
}
