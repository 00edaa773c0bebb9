//! Liveness probe controller.

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use super::Controller;

pub const HEALTHZ_PATH: &str = "/adsync/healthz";

/// Minimal liveness endpoint for orchestration health checks.
pub struct HealthController;

impl HealthController {
    pub fn new() -> Self {
        Self
    }

    async fn healthz() -> impl IntoResponse {
        Json(json!({ "status": "ok" }))
    }
}

impl Default for HealthController {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for HealthController {
    fn add_route(&self, router: Router) -> Router {
        router.route(HEALTHZ_PATH, get(Self::healthz))
    }
}
