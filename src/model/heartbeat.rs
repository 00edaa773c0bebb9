// Worker heartbeat records and their read-time classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Liveness classification derived purely from heartbeat age at read time.
/// There is no active health-check protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatState {
    Active,
    Stale,
    Dead,
}

/// Periodically overwritten by a live worker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerHeartbeat {
    pub worker_id: String,
    pub last_seen: DateTime<Utc>,
    pub jobs_processed: u64,
}

impl WorkerHeartbeat {
    /// Classifies the heartbeat by elapsed time since `last_seen`:
    /// active within ~1.5 intervals, stale within 5, dead beyond.
    pub fn classify(&self, now: DateTime<Utc>, interval: Duration) -> HeartbeatState {
        let age = (now - self.last_seen).to_std().unwrap_or(Duration::ZERO);
        if age <= interval.mul_f64(1.5) {
            HeartbeatState::Active
        } else if age <= interval * 5 {
            HeartbeatState::Stale
        } else {
            HeartbeatState::Dead
        }
    }
}
