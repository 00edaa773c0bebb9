// Package model provides cache keys, rows, jobs and heartbeat models.

pub mod key;
pub mod row;
pub mod job;
pub mod heartbeat;


// Re-export main types
pub use key::{CacheKey, DateRange, EntityType};
pub use row::{CachedRow, MetricsPayload};
pub use job::{JobLogEntry, JobParams, JobStatus, RefreshJob, JOB_TYPE_RESYNC};
pub use heartbeat::{HeartbeatState, WorkerHeartbeat};
