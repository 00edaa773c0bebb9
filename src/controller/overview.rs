//! Aggregate diagnostics controller.

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::metrics::{meter, CacheMetrics};
use crate::queue::RefreshQueue;
use crate::registry::LockBackoffRegistry;

use super::Controller;

pub const OVERVIEW_PATH: &str = "/adsync/overview";

/// Serves the aggregate metrics snapshot plus all live locks/backoffs and
/// queue state.
pub struct OverviewController {
    metrics: Arc<CacheMetrics>,
    registry: Arc<LockBackoffRegistry>,
    queue: Arc<RefreshQueue>,
}

impl OverviewController {
    pub fn new(
        metrics: Arc<CacheMetrics>,
        registry: Arc<LockBackoffRegistry>,
        queue: Arc<RefreshQueue>,
    ) -> Self {
        Self {
            metrics,
            registry,
            queue,
        }
    }

    async fn overview(
        metrics: Arc<CacheMetrics>,
        registry: Arc<LockBackoffRegistry>,
        queue: Arc<RefreshQueue>,
    ) -> impl IntoResponse {
        let registry_status = registry.status();
        meter::set_registry_gauges(registry_status.locks.len() as u64, registry_status.backoffs.len() as u64);

        Json(json!({
            "metrics": metrics.snapshot(),
            "registry": registry_status,
            "queue": queue.stats(),
        }))
    }
}

impl Controller for OverviewController {
    fn add_route(&self, router: Router) -> Router {
        let metrics = self.metrics.clone();
        let registry = self.registry.clone();
        let queue = self.queue.clone();
        router.route(
            OVERVIEW_PATH,
            get(move || {
                let metrics = metrics.clone();
                let registry = registry.clone();
                let queue = queue.clone();
                async move { Self::overview(metrics, registry, queue).await }
            }),
        )
    }
}
