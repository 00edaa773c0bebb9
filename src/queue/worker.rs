// Worker pool consuming the refresh queue.

use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, ConfigTrait};
use crate::dispatch::Coordinator;
use crate::metrics::meter;
use crate::model::JobStatus;

use super::queue::RefreshQueue;

type DirectLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Fixed-size pool of refresh workers. Each worker dequeues jobs, runs
/// the coordinator's locked refresh path and beats its heartbeat; the
/// shared limiter caps the aggregate upstream call rate.
pub struct WorkerPool {
    shutdown_token: CancellationToken,
    cfg: Config,
    queue: Arc<RefreshQueue>,
    coordinator: Arc<Coordinator>,
    limiter: Arc<DirectLimiter>,
    workers: Mutex<JoinSet<()>>,
}

impl WorkerPool {
    pub fn new(
        shutdown_token: CancellationToken,
        cfg: Config,
        queue: Arc<RefreshQueue>,
        coordinator: Arc<Coordinator>,
    ) -> Arc<Self> {
        let rate = cfg.queue_rate_limit().max(1);
        let quota = Quota::per_second(NonZeroU32::new(rate).unwrap_or(NonZeroU32::MIN));
        Arc::new(Self {
            shutdown_token,
            cfg,
            queue,
            coordinator,
            limiter: Arc::new(RateLimiter::direct(quota)),
            workers: Mutex::new(JoinSet::new()),
        })
    }

    /// Spawns the configured number of workers.
    pub async fn start(self: &Arc<Self>) {
        let count = self.cfg.queue_workers().max(1);
        let mut workers = self.workers.lock().await;
        for n in 0..count {
            let worker_id = format!("worker-{}", n);
            let this = Arc::clone(self);
            workers.spawn(async move {
                this.run_worker(worker_id).await;
            });
        }
        meter::set_workers_active(count as u64);
        info!(
            component = "queue",
            event = "workers_started",
            workers = count,
            "worker pool started"
        );
    }

    async fn run_worker(&self, worker_id: String) {
        let interval = self.cfg.heartbeat_interval();
        let mut beat = tokio::time::interval(interval);
        let mut processed: u64 = 0;
        self.queue.heartbeat(&worker_id, processed);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    info!(
                        component = "queue",
                        event = "worker_stopped",
                        worker_id = %worker_id,
                        jobs_processed = processed,
                        "worker stopped"
                    );
                    return;
                }
                _ = beat.tick() => {
                    self.queue.heartbeat(&worker_id, processed);
                }
                job = self.queue.dequeue(&self.shutdown_token) => {
                    let Some(job) = job else { return };

                    let started = Instant::now();
                    let key = job.cache_key();
                    let work = async {
                        self.limiter.until_ready().await;
                        self.coordinator.refresh_now(&key, &worker_id).await
                    };
                    tokio::pin!(work);
                    // Keep beating while the job runs; a refresh may take
                    // several heartbeat intervals.
                    let outcome = loop {
                        tokio::select! {
                            r = &mut work => break r,
                            _ = beat.tick() => {
                                self.queue.heartbeat(&worker_id, processed);
                            }
                        }
                    };
                    match outcome {
                        Ok(entity_count) => {
                            self.queue
                                .finish_job(job.id, JobStatus::Completed, started.elapsed(), entity_count, None)
                                .await;
                            info!(
                                component = "queue",
                                event = "job_completed",
                                worker_id = %worker_id,
                                job_id = job.id,
                                key = %key,
                                rows = entity_count,
                                duration_ms = started.elapsed().as_millis() as u64,
                                "refresh job completed"
                            );
                        }
                        Err(e) => {
                            self.queue
                                .finish_job(job.id, JobStatus::Failed, started.elapsed(), 0, Some(e.to_string()))
                                .await;
                            warn!(
                                component = "queue",
                                event = "job_failed",
                                worker_id = %worker_id,
                                job_id = job.id,
                                key = %key,
                                error = %e,
                                "refresh job failed"
                            );
                        }
                    }
                    processed += 1;
                    self.queue.heartbeat(&worker_id, processed);
                }
            }
        }
    }

    /// Waits for workers to observe cancellation and exit; in-flight jobs
    /// complete first.
    pub async fn close(&self) {
        let mut workers = self.workers.lock().await;
        while workers.join_next().await.is_some() {}
        meter::set_workers_active(0);
        info!(component = "queue", event = "workers_closed", "worker pool closed");
    }
}
