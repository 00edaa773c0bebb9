//! Per-key cache status controller.

use axum::{
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::inspector::Inspector;

use super::{Controller, KeyQuery};

pub const STATUS_PATH: &str = "/adsync/status";

/// Reports freshness, lock and backoff state for a single key.
pub struct StatusController {
    inspector: Arc<Inspector>,
}

impl StatusController {
    pub fn new(inspector: Arc<Inspector>) -> Self {
        Self { inspector }
    }

    async fn status(inspector: Arc<Inspector>, query: KeyQuery) -> impl IntoResponse {
        let key = match query.into_key() {
            Ok(key) => key,
            Err(reason) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": reason })));
            }
        };

        match inspector.inspect(&key).await {
            Ok(report) => (StatusCode::OK, Json(json!(report))),
            Err(e) => {
                tracing::error!(
                    component = "status",
                    event = "inspect_failed",
                    key = %key,
                    error = %e,
                    "key inspection failed"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "cache unavailable, retry" })),
                )
            }
        }
    }
}

impl Controller for StatusController {
    fn add_route(&self, router: Router) -> Router {
        let inspector = self.inspector.clone();
        router.route(
            STATUS_PATH,
            get(move |Query(query): Query<KeyQuery>| {
                let inspector = inspector.clone();
                async move { Self::status(inspector, query).await }
            }),
        )
    }
}
