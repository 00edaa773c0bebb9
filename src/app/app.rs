// Main application wiring.

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{Config, ConfigTrait};
use crate::controller::{
    Controller, HealthController, InvalidateController, OverviewController,
    PrometheusMetricsController, QueueControlController, RefreshController, StatusController,
};
use crate::dispatch::Coordinator;
use crate::freshness::Thresholds;
use crate::inspector::Inspector;
use crate::metrics::CacheMetrics;
use crate::queue::{RefreshQueue, WorkerPool};
use crate::registry::LockBackoffRegistry;
use crate::store::{CacheStore, JobLogStore};
use crate::upstream::MetricsClient;

use super::server::HttpServer;

/// Encapsulates the coordination service state.
pub struct App {
    cfg: Config,
    shutdown_token: CancellationToken,
    coordinator: Arc<Coordinator>,
    queue: Arc<RefreshQueue>,
    pool: Arc<WorkerPool>,
    server: Arc<HttpServer>,
}

impl App {
    /// Wires stores, registry, coordinator, queue and controllers
    /// together. The upstream client and stores are injected
    /// collaborators.
    pub fn new(
        shutdown_token: CancellationToken,
        cfg: Config,
        client: Arc<dyn MetricsClient>,
        store: Arc<dyn CacheStore>,
        job_log: Arc<dyn JobLogStore>,
    ) -> Result<Self> {
        let registry = Arc::new(LockBackoffRegistry::new(cfg.lock_ttl()));
        let metrics = Arc::new(CacheMetrics::new());

        let coordinator = Coordinator::new(
            shutdown_token.clone(),
            cfg.clone(),
            store.clone(),
            client,
            registry.clone(),
            metrics.clone(),
        );

        let queue = RefreshQueue::new(job_log.clone(), cfg.heartbeat_interval());
        let pool = WorkerPool::new(
            shutdown_token.clone(),
            cfg.clone(),
            queue.clone(),
            coordinator.clone(),
        );

        let inspector = Arc::new(Inspector::new(
            store.clone(),
            registry.clone(),
            job_log,
            Thresholds::new(cfg.fresh_threshold(), cfg.stale_threshold()),
        ));

        let controllers: Vec<Box<dyn Controller>> = vec![
            Box::new(HealthController::new()),
            Box::new(PrometheusMetricsController::new()),
            Box::new(StatusController::new(inspector)),
            Box::new(OverviewController::new(metrics, registry, queue.clone())),
            Box::new(RefreshController::new(queue.clone())),
            Box::new(InvalidateController::new(cfg.clone(), store)),
            Box::new(QueueControlController::new(cfg.clone(), queue.clone())),
        ];

        let server = HttpServer::new(shutdown_token.clone(), cfg.clone(), controllers)?;

        Ok(Self {
            cfg,
            shutdown_token,
            coordinator,
            queue,
            pool,
            server,
        })
    }

    /// Read-side entry point for embedding callers.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn queue(&self) -> &Arc<RefreshQueue> {
        &self.queue
    }

    pub fn server(&self) -> &Arc<HttpServer> {
        &self.server
    }

    /// Starts workers and the HTTP server, handing completion to the
    /// graceful shutdown handle.
    pub async fn serve(&self, gsh: Arc<crate::shutdown::GracefulShutdown>) -> Result<()> {
        self.pool.start().await;

        let server = self.server.clone();
        let app_for_close = self.clone();
        let gsh_clone = gsh.clone();

        tokio::task::spawn(async move {
            if let Err(e) = server.listen_and_serve().await {
                error!(
                    component = "app",
                    scope = "server",
                    event = "serve_failed",
                    error = %e,
                    "server failed to serve"
                );
            }

            app_for_close.close().await;
            gsh_clone.done();
        });

        info!(
            component = "app",
            event = "started",
            env = %self.cfg.env(),
            "application lifecycle"
        );

        Ok(())
    }

    /// Drains background refreshes and workers, cancels the token.
    pub async fn close(&self) {
        self.shutdown_token.cancel();
        self.coordinator.close().await;
        self.pool.close().await;

        info!(
            component = "app",
            event = "stopped",
            "application lifecycle"
        );
    }
}

impl Clone for App {
    fn clone(&self) -> Self {
        Self {
            cfg: self.cfg.clone(),
            shutdown_token: self.shutdown_token.clone(),
            coordinator: self.coordinator.clone(),
            queue: self.queue.clone(),
            pool: self.pool.clone(),
            server: self.server.clone(),
        }
    }
}
