use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ConfigTrait;
use crate::dispatch::Coordinator;
use crate::metrics::CacheMetrics;
use crate::model::{EntityType, HeartbeatState, JobParams, JobStatus};
use crate::queue::{RefreshQueue, WorkerPool};
use crate::registry::LockBackoffRegistry;
use crate::store::{MemoryCacheStore, MemoryJobLogStore};
use crate::tests::support::{test_config, week_range, Script, ScriptedClient};

struct Rig {
    token: CancellationToken,
    queue: Arc<RefreshQueue>,
    pool: Arc<WorkerPool>,
    store: Arc<MemoryCacheStore>,
}

fn rig(client: Arc<ScriptedClient>) -> Rig {
    let cfg = test_config();
    let token = CancellationToken::new();
    let store = Arc::new(MemoryCacheStore::new());
    let job_log = Arc::new(MemoryJobLogStore::new());

    let coordinator = Coordinator::new(
        token.clone(),
        cfg.clone(),
        store.clone(),
        client,
        Arc::new(LockBackoffRegistry::new(cfg.lock_ttl())),
        Arc::new(CacheMetrics::new()),
    );
    let queue = RefreshQueue::new(job_log, cfg.heartbeat_interval());
    let pool = WorkerPool::new(token.clone(), cfg, queue.clone(), coordinator);

    Rig { token, queue, pool, store }
}

async fn wait_for_terminal(queue: &RefreshQueue, job_id: u64) -> JobStatus {
    for _ in 0..100 {
        if let Some(job) = queue.job(job_id) {
            if matches!(job.status, JobStatus::Completed | JobStatus::Failed) {
                return job.status;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {job_id} never reached a terminal status");
}

#[tokio::test]
async fn worker_runs_enqueued_job_to_completion() {
    let client = Arc::new(ScriptedClient::new());
    let rig = rig(client.clone());

    let job_id = rig.queue.enqueue(
        "123-456",
        JobParams {
            entity_type: EntityType::Campaign,
            range: week_range(),
        },
        0,
    );
    rig.pool.start().await;

    let status = wait_for_terminal(&rig.queue, job_id).await;
    assert_eq!(status, JobStatus::Completed);
    assert_eq!(client.calls(), 1);
    assert_eq!(rig.store.len(), 7);

    let history = rig.queue.recent_jobs(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, JobStatus::Completed);
    assert_eq!(history[0].entity_count, 7);
    assert_eq!(history[0].customer_id, "123-456");
    assert!(history[0].error_message.is_none());

    let stats = rig.queue.stats();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.workers.len(), 1);
    assert_eq!(stats.workers[0].worker_id, "worker-0");
    assert!(stats.workers[0].jobs_processed >= 1);

    rig.token.cancel();
    rig.pool.close().await;
}

#[tokio::test]
async fn failed_job_logs_error_message() {
    let client = Arc::new(ScriptedClient::new());
    client.push(Script::Fail("quota exhausted".to_string()));
    let rig = rig(client.clone());

    let job_id = rig.queue.enqueue(
        "123-456",
        JobParams {
            entity_type: EntityType::Campaign,
            range: week_range(),
        },
        0,
    );
    rig.pool.start().await;

    let status = wait_for_terminal(&rig.queue, job_id).await;
    assert_eq!(status, JobStatus::Failed);
    assert_eq!(rig.store.len(), 0);

    let history = rig.queue.recent_jobs(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, JobStatus::Failed);
    assert_eq!(history[0].entity_count, 0);
    let message = history[0].error_message.as_deref().unwrap();
    assert!(message.contains("quota exhausted"), "unexpected message: {message}");

    rig.token.cancel();
    rig.pool.close().await;
}

#[tokio::test]
async fn higher_priority_job_runs_first() {
    let client = Arc::new(ScriptedClient::new());
    let rig = rig(client.clone());

    let low = rig.queue.enqueue(
        "low-customer",
        JobParams {
            entity_type: EntityType::Campaign,
            range: week_range(),
        },
        0,
    );
    let high = rig.queue.enqueue(
        "high-customer",
        JobParams {
            entity_type: EntityType::Campaign,
            range: week_range(),
        },
        9,
    );

    // A single worker drains the queue strictly by priority.
    rig.pool.start().await;
    wait_for_terminal(&rig.queue, low).await;
    wait_for_terminal(&rig.queue, high).await;

    let history = rig.queue.recent_jobs(10).await.unwrap();
    assert_eq!(history.len(), 2);
    // Newest first: the high-priority job finished before the low one.
    assert_eq!(history[1].customer_id, "high-customer");
    assert_eq!(history[0].customer_id, "low-customer");

    rig.token.cancel();
    rig.pool.close().await;
}

#[tokio::test]
async fn worker_keeps_beating_during_a_long_job() {
    // A single job that outlives several heartbeat intervals (100ms).
    let client = Arc::new(ScriptedClient::with_delay(Duration::from_millis(600)));
    let rig = rig(client.clone());

    let job_id = rig.queue.enqueue(
        "123-456",
        JobParams {
            entity_type: EntityType::Campaign,
            range: week_range(),
        },
        0,
    );
    rig.pool.start().await;

    // Mid-job the worker must still look alive, not merely between jobs.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(rig.queue.job(job_id).unwrap().status, JobStatus::Running);
    let stats = rig.queue.stats();
    assert_eq!(stats.workers.len(), 1);
    assert_eq!(stats.workers[0].state, HeartbeatState::Active);

    let status = wait_for_terminal(&rig.queue, job_id).await;
    assert_eq!(status, JobStatus::Completed);

    rig.token.cancel();
    rig.pool.close().await;
}

#[tokio::test]
async fn paused_queue_holds_jobs_until_resume() {
    let client = Arc::new(ScriptedClient::new());
    let rig = rig(client.clone());

    rig.queue.pause();
    let job_id = rig.queue.enqueue(
        "123-456",
        JobParams {
            entity_type: EntityType::Campaign,
            range: week_range(),
        },
        0,
    );
    rig.pool.start().await;

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(rig.queue.job(job_id).unwrap().status, JobStatus::Pending);
    assert_eq!(client.calls(), 0);

    rig.queue.resume();
    let status = wait_for_terminal(&rig.queue, job_id).await;
    assert_eq!(status, JobStatus::Completed);

    rig.token.cancel();
    rig.pool.close().await;
}
