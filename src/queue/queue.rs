// Prioritized refresh job queue with pause/resume/drain controls.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::metrics::meter;
use crate::model::{
    HeartbeatState, JobLogEntry, JobParams, JobStatus, RefreshJob, WorkerHeartbeat, JOB_TYPE_RESYNC,
};
use crate::store::{JobLogStore, StoreError};

/// Terminal jobs kept around for point lookups; older ones are evicted,
/// their history lives in the job log.
const RETAINED_TERMINAL_JOBS: usize = 256;

/// Heap entry: highest priority first, FIFO within a priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueuedJob {
    priority: u8,
    seq: u64,
    job_id: u64,
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// Per-worker view in queue stats.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub worker_id: String,
    pub state: HeartbeatState,
    pub last_seen: DateTime<Utc>,
    pub jobs_processed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub depth: usize,
    pub paused: bool,
    pub pending: usize,
    pub running: usize,
    pub completed: u64,
    pub failed: u64,
    pub workers: Vec<WorkerStatus>,
}

/// Work queue for full entity-type resyncs, consumed by the worker pool.
///
/// `drain` drops pending jobs only: in-flight jobs finish and log their
/// outcome normally, and held locks are never touched.
pub struct RefreshQueue {
    jobs: DashMap<u64, RefreshJob>,
    pending: Mutex<BinaryHeap<QueuedJob>>,
    terminal: Mutex<VecDeque<u64>>,
    next_id: AtomicU64,
    next_seq: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    paused: AtomicBool,
    notify: Notify,
    heartbeats: DashMap<String, WorkerHeartbeat>,
    heartbeat_interval: Duration,
    job_log: Arc<dyn JobLogStore>,
}

impl RefreshQueue {
    pub fn new(job_log: Arc<dyn JobLogStore>, heartbeat_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            jobs: DashMap::new(),
            pending: Mutex::new(BinaryHeap::new()),
            terminal: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            next_seq: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            paused: AtomicBool::new(false),
            notify: Notify::new(),
            heartbeats: DashMap::new(),
            heartbeat_interval,
            job_log,
        })
    }

    /// Appends a pending job; returns its id.
    pub fn enqueue(&self, customer_id: &str, params: JobParams, priority: u8) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = RefreshJob {
            id,
            job_type: JOB_TYPE_RESYNC.to_string(),
            customer_id: customer_id.to_string(),
            params,
            priority,
            status: JobStatus::Pending,
            created_at: Utc::now(),
        };
        self.jobs.insert(id, job);

        let depth = {
            let mut pending = self.pending.lock();
            pending.push(QueuedJob {
                priority,
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                job_id: id,
            });
            pending.len()
        };
        meter::set_queue_depth(depth as u64);
        self.notify.notify_one();
        id
    }

    /// Takes the next runnable job, waiting while the queue is empty or
    /// paused. Returns None once the token is cancelled.
    pub async fn dequeue(&self, token: &CancellationToken) -> Option<RefreshJob> {
        loop {
            if !self.paused.load(Ordering::Relaxed) {
                if let Some(job) = self.pop_pending() {
                    return Some(job);
                }
            }
            tokio::select! {
                _ = token.cancelled() => return None,
                _ = self.notify.notified() => {}
                // Poll fallback for wakeups racing past the notify.
                _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
        }
    }

    fn pop_pending(&self) -> Option<RefreshJob> {
        let (entry, depth) = {
            let mut pending = self.pending.lock();
            let entry = pending.pop();
            (entry, pending.len())
        };
        let entry = entry?;
        meter::set_queue_depth(depth as u64);

        let mut job = self.jobs.get_mut(&entry.job_id)?;
        job.status = JobStatus::Running;
        Some(job.clone())
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
        info!(component = "queue", event = "paused", "queue paused");
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
        self.notify.notify_waiters();
        info!(component = "queue", event = "resumed", "queue resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Removes all pending (not-yet-started) jobs. Each dropped job is
    /// recorded in the append-only history as failed.
    pub async fn drain(&self) -> usize {
        let dropped: Vec<QueuedJob> = {
            let mut pending = self.pending.lock();
            pending.drain().collect()
        };
        meter::set_queue_depth(0);

        for entry in &dropped {
            if let Some(mut job) = self.jobs.get_mut(&entry.job_id) {
                job.status = JobStatus::Failed;
                let log_entry = JobLogEntry {
                    job_type: job.job_type.clone(),
                    customer_id: job.customer_id.clone(),
                    status: JobStatus::Failed,
                    duration_ms: 0,
                    entity_count: 0,
                    error_message: Some("drained before start".to_string()),
                    created_at: Utc::now(),
                };
                drop(job);
                self.failed.fetch_add(1, Ordering::Relaxed);
                meter::add_jobs_failed(1);
                self.retain_terminal(entry.job_id);
                self.append_history(entry.job_id, log_entry).await;
            }
        }

        info!(
            component = "queue",
            event = "drained",
            dropped = dropped.len(),
            "pending jobs dropped"
        );
        dropped.len()
    }

    /// Records a terminal outcome for a job and appends it to history.
    pub async fn finish_job(
        &self,
        job_id: u64,
        status: JobStatus,
        duration: Duration,
        entity_count: u64,
        error_message: Option<String>,
    ) {
        let entry = {
            let Some(mut job) = self.jobs.get_mut(&job_id) else {
                return;
            };
            job.status = status;
            JobLogEntry {
                job_type: job.job_type.clone(),
                customer_id: job.customer_id.clone(),
                status,
                duration_ms: duration.as_millis() as u64,
                entity_count,
                error_message,
                created_at: Utc::now(),
            }
        };

        match status {
            JobStatus::Completed => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                meter::add_jobs_completed(1);
            }
            JobStatus::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                meter::add_jobs_failed(1);
            }
            _ => {}
        }
        self.retain_terminal(job_id);
        self.append_history(job_id, entry).await;
    }

    /// Keeps the most recent terminal jobs addressable by id; the evicted
    /// ones survive in the job log only.
    fn retain_terminal(&self, job_id: u64) {
        let evicted = {
            let mut terminal = self.terminal.lock();
            terminal.push_back(job_id);
            if terminal.len() > RETAINED_TERMINAL_JOBS {
                terminal.pop_front()
            } else {
                None
            }
        };
        if let Some(old_id) = evicted {
            self.jobs.remove(&old_id);
        }
    }

    /// Appends a history row. A failed append never undoes the job's
    /// terminal status; it is logged and counted instead.
    async fn append_history(&self, job_id: u64, entry: JobLogEntry) {
        if let Err(e) = self.job_log.append(entry).await {
            meter::add_job_log_append_failures(1);
            warn!(
                component = "queue",
                event = "job_log_append_failed",
                job_id,
                error = %e,
                "job outcome missing from history"
            );
        }
    }

    /// Overwrites the heartbeat record for a worker.
    pub fn heartbeat(&self, worker_id: &str, jobs_processed: u64) {
        self.heartbeats.insert(
            worker_id.to_string(),
            WorkerHeartbeat {
                worker_id: worker_id.to_string(),
                last_seen: Utc::now(),
                jobs_processed,
            },
        );
    }

    pub fn depth(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn stats(&self) -> QueueStats {
        let now = Utc::now();
        let mut pending = 0;
        let mut running = 0;
        // Completed/failed come from cumulative counters; retained
        // terminal map entries are a bounded lookup window, not a tally.
        for job in self.jobs.iter() {
            match job.status {
                JobStatus::Pending => pending += 1,
                JobStatus::Running => running += 1,
                JobStatus::Completed | JobStatus::Failed => {}
            }
        }

        let mut workers: Vec<WorkerStatus> = self
            .heartbeats
            .iter()
            .map(|e| WorkerStatus {
                worker_id: e.worker_id.clone(),
                state: e.classify(now, self.heartbeat_interval),
                last_seen: e.last_seen,
                jobs_processed: e.jobs_processed,
            })
            .collect();
        workers.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));

        QueueStats {
            depth: self.depth(),
            paused: self.is_paused(),
            pending,
            running,
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            workers,
        }
    }

    /// Recent job outcomes, newest first.
    pub async fn recent_jobs(&self, limit: usize) -> Result<Vec<JobLogEntry>, StoreError> {
        self.job_log.query_recent(limit, None).await
    }

    pub fn job(&self, id: u64) -> Option<RefreshJob> {
        self.jobs.get(&id).map(|j| j.clone())
    }
}
