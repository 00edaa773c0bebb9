// HTTP API controllers for the operational surface.

pub mod controller;
pub mod status;
pub mod overview;
pub mod admin;
pub mod queue;
pub mod metrics;
pub mod probe;

// Re-export controller types for convenience
pub use controller::Controller;
pub use status::StatusController;
pub use overview::OverviewController;
pub use admin::{InvalidateController, RefreshController};
pub use queue::QueueControlController;
pub use metrics::{init_prometheus_exporter, PrometheusMetricsController};
pub use probe::HealthController;

use axum::http::HeaderMap;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::config::{Config, ConfigTrait};
use crate::model::{CacheKey, EntityType};

pub const OPERATOR_TOKEN_HEADER: &str = "x-operator-token";

/// Query-string form of a cache key, shared by key-scoped endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyQuery {
    pub customer_id: String,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub parent_entity_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl KeyQuery {
    /// Builds the normalized key; both or neither range ends must be set.
    pub fn into_key(self) -> Result<CacheKey, &'static str> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if end < start => {
                Err("end_date must not precede start_date")
            }
            (Some(_), None) | (None, Some(_)) => {
                Err("start_date and end_date must be provided together")
            }
            _ => Ok(CacheKey {
                customer_id: self.customer_id,
                entity_type: self.entity_type,
                entity_id: self.entity_id,
                parent_entity_id: self.parent_entity_id,
                start_date: self.start_date,
                end_date: self.end_date,
            }),
        }
    }
}

/// Checks the elevated operator credential required for destructive
/// actions; distinct from normal session auth, which never reaches this
/// service.
pub fn operator_authorized(cfg: &Config, headers: &HeaderMap) -> bool {
    let Some(expected) = cfg.operator_token() else {
        // No token configured: destructive actions are disabled outright.
        return false;
    };
    headers
        .get(OPERATOR_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|got| got == expected)
        .unwrap_or(false)
}
