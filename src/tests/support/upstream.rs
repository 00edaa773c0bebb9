// Scripted upstream client for deterministic fetch behavior.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::model::{CachedRow, DateRange, EntityType};
use crate::upstream::{FetchError, MetricsClient};

use super::common::rows_for;

/// One scripted response; consumed in FIFO order. When the script queue
/// is empty the client serves one freshly-synced row per day.
pub enum Script {
    RateLimited(Option<Duration>),
    Fail(String),
}

pub struct ScriptedClient {
    scripts: Mutex<VecDeque<Script>>,
    calls: AtomicUsize,
    default_delay: Duration,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            default_delay: Duration::ZERO,
        }
    }

    /// Client whose default (unscripted) responses take `delay` to land,
    /// for exercising contention windows.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            default_delay: delay,
        }
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().push_back(script);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MetricsClient for ScriptedClient {
    async fn fetch_metrics(
        &self,
        customer_id: &str,
        entity_type: EntityType,
        range: DateRange,
    ) -> Result<Vec<CachedRow>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let script = self.scripts.lock().pop_front();
        match script {
            Some(Script::RateLimited(retry_after)) => Err(FetchError::RateLimited { retry_after }),
            Some(Script::Fail(message)) => Err(FetchError::Upstream(message)),
            None => {
                if !self.default_delay.is_zero() {
                    tokio::time::sleep(self.default_delay).await;
                }
                Ok(rows_for(customer_id, entity_type, range, Utc::now()))
            }
        }
    }
}
