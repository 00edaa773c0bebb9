// Persisted metric observations for an entity on a date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::key::EntityType;

/// Metric payload fetched from the upstream advertising API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MetricsPayload {
    pub impressions: u64,
    pub clicks: u64,
    pub cost_micros: u64,
    pub conversions: f64,
}

/// One synced metric row. Natural key: (customer_id, entity_type, entity_id, date).
/// Rows are only ever written through upserts on that key, so concurrent
/// duplicate writes collapse into last-write-wins.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CachedRow {
    pub customer_id: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub parent_entity_id: Option<String>,
    pub date: NaiveDate,
    pub synced_at: DateTime<Utc>,
    pub metrics: MetricsPayload,
}

impl CachedRow {
    /// The natural identity this row upserts on.
    pub fn natural_key(&self) -> (String, EntityType, String, NaiveDate) {
        (
            self.customer_id.clone(),
            self.entity_type,
            self.entity_id.clone(),
            self.date,
        )
    }
}
