// Package dispatch coordinates reads, blocking fetches and
// stale-while-revalidate background refreshes.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{Config, ConfigTrait};
use crate::freshness::{self, FreshnessState, Thresholds};
use crate::metrics::CacheMetrics;
use crate::model::{CacheKey, CachedRow, DateRange};
use crate::registry::LockBackoffRegistry;
use crate::store::CacheStore;
use crate::upstream::{FetchError, MetricsClient};

pub const OWNER_BLOCKING: &str = "blocking";
pub const OWNER_BACKGROUND: &str = "background";

/// Coordinates all refresh traffic for cache keys.
///
/// Within a single key, refresh attempts are serialized through the
/// registry; across keys they run independently. Background work is held
/// in a bounded JoinSet so shutdown can wait for in-flight refreshes.
pub struct Coordinator {
    shutdown_token: CancellationToken,
    cfg: Config,
    store: Arc<dyn CacheStore>,
    client: Arc<dyn MetricsClient>,
    registry: Arc<LockBackoffRegistry>,
    metrics: Arc<CacheMetrics>,
    background: Mutex<JoinSet<()>>,
}

impl Coordinator {
    pub fn new(
        shutdown_token: CancellationToken,
        cfg: Config,
        store: Arc<dyn CacheStore>,
        client: Arc<dyn MetricsClient>,
        registry: Arc<LockBackoffRegistry>,
        metrics: Arc<CacheMetrics>,
    ) -> Arc<Self> {
        Arc::new(Self {
            shutdown_token,
            cfg,
            store,
            client,
            registry,
            metrics,
            background: Mutex::new(JoinSet::new()),
        })
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.cfg.fresh_threshold(), self.cfg.stale_threshold())
    }

    pub fn registry(&self) -> &Arc<LockBackoffRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    /// Read path: serve cached rows when servable, trigger a background
    /// refresh when aging, block on a fetch when nothing usable exists.
    pub async fn get_metrics(self: &Arc<Self>, key: &CacheKey) -> Result<Vec<CachedRow>, FetchError> {
        let rows = self.store.find_rows(key).await?;
        let state = freshness::classify(&rows, key.expected_coverage(), Utc::now(), self.thresholds());

        match state {
            FreshnessState::Fresh => {
                self.metrics.add_hit();
                Ok(rows)
            }
            FreshnessState::Stale => {
                // Usable now, aging: serve immediately, refresh behind the
                // caller's back.
                self.metrics.add_hit();
                self.metrics.add_stale_refresh();
                self.maybe_refresh_in_background(key).await;
                Ok(rows)
            }
            FreshnessState::Missing | FreshnessState::Expired => {
                self.metrics.add_miss();
                self.get_or_fetch(key).await
            }
        }
    }

    /// Stale-while-revalidate dispatch. Never blocks the caller; a backoff
    /// window or a lock held elsewhere turns it into a counted no-op.
    pub async fn maybe_refresh_in_background(self: &Arc<Self>, key: &CacheKey) {
        if self.registry.is_in_backoff(key) {
            self.metrics.add_throttle_event();
            debug!(
                component = "dispatch",
                event = "background_skipped",
                key = %key,
                "key in backoff, background refresh skipped"
            );
            return;
        }

        let Some(guard) = self.registry.guard(key, OWNER_BACKGROUND) else {
            self.metrics.add_lock_contention();
            debug!(
                component = "dispatch",
                event = "background_contended",
                key = %key,
                "refresh already in flight, background refresh skipped"
            );
            return;
        };

        let mut background = self.background.lock().await;
        // Reap finished tasks before counting capacity.
        while background.try_join_next().is_some() {}
        if background.len() >= self.cfg.max_background_tasks() {
            warn!(
                component = "dispatch",
                event = "background_pool_full",
                key = %key,
                in_flight = background.len(),
                "background pool saturated, refresh skipped"
            );
            return; // guard drops here and releases the lock
        }

        let this = Arc::clone(self);
        let key = key.clone();
        background.spawn(async move {
            let _guard = guard; // released on every exit path
            if this.shutdown_token.is_cancelled() {
                return;
            }
            match this.fetch_and_store(&key).await {
                Ok(rows) => {
                    this.metrics.add_background_refresh();
                    debug!(
                        component = "dispatch",
                        event = "background_refreshed",
                        key = %key,
                        rows = rows.len(),
                        "background refresh stored"
                    );
                }
                Err(e) => {
                    // Background errors are logged and counted, never
                    // surfaced to the original caller.
                    this.metrics.add_background_refresh_error();
                    warn!(
                        component = "dispatch",
                        event = "background_refresh_failed",
                        key = %key,
                        error = %e,
                        "background refresh failed"
                    );
                }
            }
        });
    }

    /// Blocking path for missing/expired keys. Lock contention turns into
    /// a bounded wait on the in-flight refresh, never a duplicate fetch.
    pub async fn get_or_fetch(&self, key: &CacheKey) -> Result<Vec<CachedRow>, FetchError> {
        if let Some(remaining) = self.registry.backoff_remaining(key) {
            self.metrics.add_throttle_event();
            return Err(FetchError::RetryLater { remaining });
        }

        match self.registry.guard(key, OWNER_BLOCKING) {
            Some(_guard) => self.fetch_and_store(key).await,
            None => {
                self.metrics.add_lock_contention();
                self.await_in_flight(key).await
            }
        }
    }

    /// Forced refresh regardless of freshness; used by queue workers and
    /// the admin refresh path. Returns the number of rows stored.
    pub async fn refresh_now(&self, key: &CacheKey, owner: &str) -> Result<u64, FetchError> {
        if let Some(remaining) = self.registry.backoff_remaining(key) {
            self.metrics.add_throttle_event();
            return Err(FetchError::RetryLater { remaining });
        }
        let Some(_guard) = self.registry.guard(key, owner) else {
            self.metrics.add_lock_contention();
            return Err(FetchError::RefreshInProgress);
        };
        let rows = self.fetch_and_store(key).await?;
        Ok(rows.len() as u64)
    }

    /// Polls the store while another refresh holds the lock; serves
    /// whatever lands within the contention window. The first read
    /// happens before any sleep, so a refresh that already landed rows
    /// costs the waiter nothing.
    async fn await_in_flight(&self, key: &CacheKey) -> Result<Vec<CachedRow>, FetchError> {
        let deadline = tokio::time::Instant::now() + self.cfg.contention_wait();
        loop {
            let rows = self.store.find_rows(key).await?;
            let state =
                freshness::classify(&rows, key.expected_coverage(), Utc::now(), self.thresholds());
            if state.is_servable() {
                return Ok(rows);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(FetchError::RefreshInProgress);
            }
            tokio::time::sleep(self.cfg.contention_poll_interval()).await;
        }
    }

    /// Performs the upstream fetch with the caller-visible timeout and
    /// stores the result via idempotent upserts. Installs backoffs on
    /// failure; the caller owns the lock.
    ///
    /// The fetch runs in its own task: when the timeout fires only the
    /// caller gives up, the attempt finishes and upserts on its own
    /// schedule. Late writes stay safe because they upsert.
    async fn fetch_and_store(&self, key: &CacheKey) -> Result<Vec<CachedRow>, FetchError> {
        let range = key.date_range().unwrap_or_else(|| {
            let today = Utc::now().date_naive();
            DateRange::new(today, today)
        });

        let fetch_timeout = self.cfg.fetch_timeout();
        let client = Arc::clone(&self.client);
        let store = Arc::clone(&self.store);
        let customer_id = key.customer_id.clone();
        let entity_type = key.entity_type;
        let attempt = tokio::spawn(async move {
            let rows = client.fetch_metrics(&customer_id, entity_type, range).await?;
            store.upsert_rows(&rows).await?;
            Ok::<Vec<CachedRow>, FetchError>(rows)
        });

        match tokio::time::timeout(fetch_timeout, attempt).await {
            Err(_) => {
                self.registry.set_backoff(key, self.cfg.error_cooldown());
                Err(FetchError::Timeout(fetch_timeout))
            }
            Ok(Err(join_err)) => {
                self.registry.set_backoff(key, self.cfg.error_cooldown());
                Err(FetchError::Upstream(format!("fetch task failed: {join_err}")))
            }
            Ok(Ok(Err(FetchError::RateLimited { retry_after }))) => {
                let window = retry_after.unwrap_or_else(|| self.cfg.backoff_fallback());
                self.registry.set_backoff(key, window);
                warn!(
                    component = "dispatch",
                    event = "upstream_rate_limited",
                    key = %key,
                    backoff_secs = window.as_secs(),
                    "backoff installed after upstream throttle"
                );
                Err(FetchError::RateLimited {
                    retry_after: Some(window),
                })
            }
            Ok(Ok(Err(e))) => {
                // Short cooldown so a burst of callers cannot hammer a
                // failing upstream.
                self.registry.set_backoff(key, self.cfg.error_cooldown());
                Err(e)
            }
            Ok(Ok(Ok(rows))) => Ok(rows),
        }
    }

    /// Waits for in-flight background refreshes, logging abandonment if
    /// they outlive the grace period.
    pub async fn close(&self) {
        let mut background = self.background.lock().await;
        let grace = self.cfg.fetch_timeout();
        let drained = tokio::time::timeout(grace, async {
            while background.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                component = "dispatch",
                event = "background_abandoned",
                abandoned = background.len(),
                "background refreshes abandoned at shutdown"
            );
            background.abort_all();
        }
    }
}
