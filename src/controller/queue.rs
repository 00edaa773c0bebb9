//! Queue control controller.

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::queue::RefreshQueue;

use super::{operator_authorized, Controller};

pub const QUEUE_PATH: &str = "/adsync/queue";
pub const QUEUE_JOBS_PATH: &str = "/adsync/queue/jobs";

const DEFAULT_RECENT_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueAction {
    Pause,
    Resume,
    Drain,
}

#[derive(Debug, Deserialize)]
pub struct QueueControlBody {
    pub action: QueueAction,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// Pause/resume/drain and queue introspection. Drain destroys pending
/// work, so it requires the operator token; pause/resume do not.
pub struct QueueControlController {
    cfg: Arc<Config>,
    queue: Arc<RefreshQueue>,
}

impl QueueControlController {
    pub fn new(cfg: Config, queue: Arc<RefreshQueue>) -> Self {
        Self {
            cfg: Arc::new(cfg),
            queue,
        }
    }

    async fn control(
        cfg: Arc<Config>,
        queue: Arc<RefreshQueue>,
        headers: HeaderMap,
        body: QueueControlBody,
    ) -> impl IntoResponse {
        match body.action {
            QueueAction::Pause => {
                queue.pause();
                (StatusCode::OK, Json(json!({ "success": true, "paused": true })))
            }
            QueueAction::Resume => {
                queue.resume();
                (StatusCode::OK, Json(json!({ "success": true, "paused": false })))
            }
            QueueAction::Drain => {
                if !operator_authorized(&cfg, &headers) {
                    return (
                        StatusCode::FORBIDDEN,
                        Json(json!({ "error": "operator authorization required" })),
                    );
                }
                let dropped = queue.drain().await;
                (StatusCode::OK, Json(json!({ "success": true, "dropped": dropped })))
            }
        }
    }

    async fn stats(queue: Arc<RefreshQueue>) -> impl IntoResponse {
        Json(json!(queue.stats()))
    }

    async fn recent(queue: Arc<RefreshQueue>, limit: Option<usize>) -> impl IntoResponse {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        match queue.recent_jobs(limit).await {
            Ok(jobs) => (StatusCode::OK, Json(json!({ "jobs": jobs }))),
            Err(e) => {
                tracing::error!(
                    component = "queue",
                    event = "recent_jobs_failed",
                    error = %e,
                    "job history query failed"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "job history unavailable, retry" })),
                )
            }
        }
    }
}

impl Controller for QueueControlController {
    fn add_route(&self, router: Router) -> Router {
        let cfg = self.cfg.clone();
        let control_queue = self.queue.clone();
        let stats_queue = self.queue.clone();
        let recent_queue = self.queue.clone();

        router
            .route(
                QUEUE_PATH,
                post(move |headers: HeaderMap, Json(body): Json<QueueControlBody>| {
                    let cfg = cfg.clone();
                    let queue = control_queue.clone();
                    async move { Self::control(cfg, queue, headers, body).await }
                })
                .get(move || {
                    let queue = stats_queue.clone();
                    async move { Self::stats(queue).await }
                }),
            )
            .route(
                QUEUE_JOBS_PATH,
                get(move |axum::extract::Query(q): axum::extract::Query<RecentQuery>| {
                    let queue = recent_queue.clone();
                    async move { Self::recent(queue, q.limit).await }
                }),
            )
    }
}
