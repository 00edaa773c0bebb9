// Durable refresh jobs and append-only job-log history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::{CacheKey, DateRange, EntityType};

pub const JOB_TYPE_RESYNC: &str = "resync";

/// Parameters of a full entity-type resync.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JobParams {
    pub entity_type: EntityType,
    pub range: DateRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A unit of queued refresh work. Completed and Failed are terminal;
/// the job-log history row written at that point is never mutated.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshJob {
    pub id: u64,
    pub job_type: String,
    pub customer_id: String,
    pub params: JobParams,
    pub priority: u8,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl RefreshJob {
    /// The cache key this job refreshes.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::ranged(self.customer_id.clone(), self.params.entity_type, self.params.range)
    }
}

/// Append-only job-log row recording a terminal job outcome.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobLogEntry {
    pub job_type: String,
    pub customer_id: String,
    pub status: JobStatus,
    pub duration_ms: u64,
    pub entity_count: u64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}
