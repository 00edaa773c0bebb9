// Package upstream defines the advertising metrics client interface.

pub mod simulated;

pub use simulated::SimulatedClient;

use std::time::Duration;

use crate::model::{CachedRow, DateRange, EntityType};
use crate::store::StoreError;

/// Typed failure taxonomy for the fetch paths.
///
/// `RefreshInProgress` and `RetryLater` are expected concurrency signals,
/// not faults; user-facing surfaces must render them as "try again shortly"
/// rather than a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("refresh already in progress for this key")]
    RefreshInProgress,

    #[error("key is throttled, retry in {remaining:?}")]
    RetryLater { remaining: Duration },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    /// Whether the caller should simply retry shortly.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited { .. }
                | FetchError::RefreshInProgress
                | FetchError::RetryLater { .. }
        )
    }
}

/// Upstream metrics API client. Credential handling lives inside the
/// implementation; the coordination layer only sees customer ids.
#[async_trait::async_trait]
pub trait MetricsClient: Send + Sync {
    /// Fetches one metric row per entity per day over the range.
    async fn fetch_metrics(
        &self,
        customer_id: &str,
        entity_type: EntityType,
        range: DateRange,
    ) -> Result<Vec<CachedRow>, FetchError>;
}
