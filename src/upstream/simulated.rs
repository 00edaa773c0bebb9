// Simulated upstream used when no real Ads API client is wired in.

use chrono::Utc;
use rand::Rng;
use std::time::Duration;

use crate::model::{CachedRow, DateRange, EntityType, MetricsPayload};

use super::{FetchError, MetricsClient};

/// Deterministic-shape, random-value metrics source. Stands in for the
/// real advertising API client in local runs; entity count per day and an
/// artificial latency are configurable.
pub struct SimulatedClient {
    entities_per_day: usize,
    latency: Duration,
}

impl SimulatedClient {
    pub fn new(entities_per_day: usize, latency: Duration) -> Self {
        Self {
            entities_per_day: entities_per_day.max(1),
            latency,
        }
    }
}

impl Default for SimulatedClient {
    fn default() -> Self {
        Self::new(1, Duration::from_millis(50))
    }
}

#[async_trait::async_trait]
impl MetricsClient for SimulatedClient {
    async fn fetch_metrics(
        &self,
        customer_id: &str,
        entity_type: EntityType,
        range: DateRange,
    ) -> Result<Vec<CachedRow>, FetchError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let now = Utc::now();
        let mut rows = Vec::with_capacity(range.days() * self.entities_per_day);
        for date in range.iter_days() {
            for n in 0..self.entities_per_day {
                let mut rng = rand::thread_rng();
                let impressions = rng.gen_range(100..50_000);
                rows.push(CachedRow {
                    customer_id: customer_id.to_string(),
                    entity_type,
                    entity_id: format!("{}-{}", entity_type, n + 1),
                    parent_entity_id: None,
                    date,
                    synced_at: now,
                    metrics: MetricsPayload {
                        impressions,
                        clicks: impressions / rng.gen_range(5..50),
                        cost_micros: rng.gen_range(1_000..5_000_000),
                        conversions: rng.gen_range(0.0..25.0),
                    },
                });
            }
        }
        Ok(rows)
    }
}
