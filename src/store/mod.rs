// Package store defines the cache row and job-log storage seams.
//
// The relational store backing these traits is an external collaborator;
// the in-memory implementations here serve local runs and tests.

pub mod memory;

pub use memory::{MemoryCacheStore, MemoryJobLogStore};

use crate::model::{CacheKey, CachedRow, JobLogEntry};

/// Failure talking to the backing store.
#[derive(Debug, thiserror::Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// Synced metric rows keyed by (customer_id, entity_type, entity_id, date).
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Rows matching the key's customer, entity type, optional entity id
    /// and optional date range.
    async fn find_rows(&self, key: &CacheKey) -> Result<Vec<CachedRow>, StoreError>;

    /// Idempotent upsert on the natural key; writing the same identity
    /// twice never creates two rows.
    async fn upsert_rows(&self, rows: &[CachedRow]) -> Result<(), StoreError>;

    /// Deletes rows matching the key so the next read classifies Missing.
    /// Returns the number of rows removed.
    async fn delete_rows(&self, key: &CacheKey) -> Result<u64, StoreError>;
}

/// Append-only job outcome history. Rows are never mutated or deleted by
/// this layer; retention is an external concern.
#[async_trait::async_trait]
pub trait JobLogStore: Send + Sync {
    async fn append(&self, entry: JobLogEntry) -> Result<(), StoreError>;

    /// Most recent entries first, optionally filtered by customer.
    async fn query_recent(
        &self,
        limit: usize,
        customer_id: Option<&str>,
    ) -> Result<Vec<JobLogEntry>, StoreError>;
}
