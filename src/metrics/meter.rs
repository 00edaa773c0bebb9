// Metric name constants and recorder helpers.

pub const HITS: &str = "cache_hits";
pub const MISSES: &str = "cache_misses";
pub const STALE_REFRESHES: &str = "cache_stale_refreshes";
pub const LOCK_CONTENTIONS: &str = "lock_contentions";
pub const THROTTLE_EVENTS: &str = "throttle_events";
pub const BACKGROUND_REFRESHES: &str = "background_refreshes";
pub const BACKGROUND_REFRESH_ERRORS: &str = "background_refresh_errors";

pub const QUEUE_DEPTH: &str = "queue_depth";
pub const JOBS_COMPLETED: &str = "queue_jobs_completed";
pub const JOBS_FAILED: &str = "queue_jobs_failed";
pub const JOB_LOG_APPEND_FAILURES: &str = "queue_job_log_append_failures";
pub const WORKERS_ACTIVE: &str = "queue_workers_active";

pub const ACTIVE_LOCKS: &str = "registry_active_locks";
pub const ACTIVE_BACKOFFS: &str = "registry_active_backoffs";

/// Adds cache hits.
pub fn add_hits(value: u64) {
    metrics::counter!(HITS).increment(value);
}

/// Adds cache misses.
pub fn add_misses(value: u64) {
    metrics::counter!(MISSES).increment(value);
}

/// Adds stale-while-revalidate refreshes triggered on the read path.
pub fn add_stale_refreshes(value: u64) {
    metrics::counter!(STALE_REFRESHES).increment(value);
}

/// Adds failed try-acquire calls.
pub fn add_lock_contentions(value: u64) {
    metrics::counter!(LOCK_CONTENTIONS).increment(value);
}

/// Adds fetches skipped or rejected by a backoff window.
pub fn add_throttle_events(value: u64) {
    metrics::counter!(THROTTLE_EVENTS).increment(value);
}

/// Adds completed background refreshes.
pub fn add_background_refreshes(value: u64) {
    metrics::counter!(BACKGROUND_REFRESHES).increment(value);
}

/// Adds failed background refreshes.
pub fn add_background_refresh_errors(value: u64) {
    metrics::counter!(BACKGROUND_REFRESH_ERRORS).increment(value);
}

/// Sets the pending job queue depth.
pub fn set_queue_depth(depth: u64) {
    metrics::gauge!(QUEUE_DEPTH).set(depth as f64);
}

/// Adds completed queue jobs.
pub fn add_jobs_completed(value: u64) {
    metrics::counter!(JOBS_COMPLETED).increment(value);
}

/// Adds failed queue jobs.
pub fn add_jobs_failed(value: u64) {
    metrics::counter!(JOBS_FAILED).increment(value);
}

/// Adds job-log rows lost to a failing history store.
pub fn add_job_log_append_failures(value: u64) {
    metrics::counter!(JOB_LOG_APPEND_FAILURES).increment(value);
}

/// Sets the number of live workers.
pub fn set_workers_active(count: u64) {
    metrics::gauge!(WORKERS_ACTIVE).set(count as f64);
}

/// Sets live registry gauges.
pub fn set_registry_gauges(locks: u64, backoffs: u64) {
    metrics::gauge!(ACTIVE_LOCKS).set(locks as f64);
    metrics::gauge!(ACTIVE_BACKOFFS).set(backoffs as f64);
}
