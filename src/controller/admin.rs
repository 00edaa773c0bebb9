//! Admin refresh and invalidate controllers.

use axum::{
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::model::{DateRange, JobParams};
use crate::queue::RefreshQueue;
use crate::store::CacheStore;

use super::{operator_authorized, Controller, KeyQuery};

pub const REFRESH_PATH: &str = "/adsync/refresh";
pub const INVALIDATE_PATH: &str = "/adsync/invalidate";

const DEFAULT_RANGE_DAYS: i64 = 7;

// Not flattened over KeyQuery: serde_urlencoded cannot drive flattened
// structs with typed fields.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshQuery {
    pub customer_id: String,
    pub entity_type: crate::model::EntityType,
    pub entity_id: Option<String>,
    pub parent_entity_id: Option<String>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub priority: Option<u8>,
}

impl RefreshQuery {
    fn into_parts(self) -> (KeyQuery, Option<u8>) {
        (
            KeyQuery {
                customer_id: self.customer_id,
                entity_type: self.entity_type,
                entity_id: self.entity_id,
                parent_entity_id: self.parent_entity_id,
                start_date: self.start_date,
                end_date: self.end_date,
            },
            self.priority,
        )
    }
}

/// Enqueues a full resync job for the key. Goes through the job queue,
/// never the inline blocking path.
pub struct RefreshController {
    queue: Arc<RefreshQueue>,
}

impl RefreshController {
    pub fn new(queue: Arc<RefreshQueue>) -> Self {
        Self { queue }
    }

    async fn refresh(queue: Arc<RefreshQueue>, query: RefreshQuery) -> impl IntoResponse {
        let (key_query, priority) = query.into_parts();
        let priority = priority.unwrap_or(0);
        let key = match key_query.into_key() {
            Ok(key) => key,
            Err(reason) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": reason })));
            }
        };

        // Jobs always carry an explicit range; default to the last week.
        let range = key.date_range().unwrap_or_else(|| {
            let today = Utc::now().date_naive();
            DateRange::new(today - ChronoDuration::days(DEFAULT_RANGE_DAYS - 1), today)
        });

        let job_id = queue.enqueue(
            &key.customer_id,
            JobParams {
                entity_type: key.entity_type,
                range,
            },
            priority,
        );

        tracing::info!(
            component = "admin",
            event = "refresh_enqueued",
            key = %key,
            job_id,
            priority,
            "refresh job enqueued"
        );

        (StatusCode::ACCEPTED, Json(json!({ "success": true, "job_id": job_id })))
    }
}

impl Controller for RefreshController {
    fn add_route(&self, router: Router) -> Router {
        let queue = self.queue.clone();
        router.route(
            REFRESH_PATH,
            post(move |Query(query): Query<RefreshQuery>| {
                let queue = queue.clone();
                async move { Self::refresh(queue, query).await }
            }),
        )
    }
}

/// Deletes cached rows for the key so the next read classifies Missing.
/// Destructive, so gated by the operator token.
pub struct InvalidateController {
    cfg: Arc<Config>,
    store: Arc<dyn CacheStore>,
}

impl InvalidateController {
    pub fn new(cfg: Config, store: Arc<dyn CacheStore>) -> Self {
        Self {
            cfg: Arc::new(cfg),
            store,
        }
    }

    async fn invalidate(
        cfg: Arc<Config>,
        store: Arc<dyn CacheStore>,
        headers: HeaderMap,
        query: KeyQuery,
    ) -> impl IntoResponse {
        if !operator_authorized(&cfg, &headers) {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "operator authorization required" })),
            );
        }

        let key = match query.into_key() {
            Ok(key) => key,
            Err(reason) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": reason })));
            }
        };

        match store.delete_rows(&key).await {
            Ok(affected) => {
                tracing::info!(
                    component = "admin",
                    event = "invalidated",
                    key = %key,
                    affected,
                    "cache rows invalidated"
                );
                (StatusCode::OK, Json(json!({ "success": true, "affected": affected })))
            }
            Err(e) => {
                tracing::error!(
                    component = "admin",
                    event = "invalidate_failed",
                    key = %key,
                    error = %e,
                    "invalidation failed"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": "cache unavailable, retry" })),
                )
            }
        }
    }
}

impl Controller for InvalidateController {
    fn add_route(&self, router: Router) -> Router {
        let cfg = self.cfg.clone();
        let store = self.store.clone();
        router.route(
            INVALIDATE_PATH,
            post(move |headers: HeaderMap, Query(query): Query<KeyQuery>| {
                let cfg = cfg.clone();
                let store = store.clone();
                async move { Self::invalidate(cfg, store, headers, query).await }
            }),
        )
    }
}
