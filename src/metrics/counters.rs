// Injected counter set for the coordination layer.
//
// Counters live in an explicitly owned struct (no hidden global) so tests
// construct isolated instances; each increment mirrors into the global
// Prometheus recorder through the meter helpers.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use super::meter;

#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_refreshes: AtomicU64,
    lock_contentions: AtomicU64,
    throttle_events: AtomicU64,
    background_refreshes: AtomicU64,
    background_refresh_errors: AtomicU64,
}

/// Point-in-time counter values for the overview endpoint.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stale_refreshes: u64,
    pub lock_contentions: u64,
    pub throttle_events: u64,
    pub background_refreshes: u64,
    pub background_refresh_errors: u64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        meter::add_hits(1);
    }

    pub fn add_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        meter::add_misses(1);
    }

    pub fn add_stale_refresh(&self) {
        self.stale_refreshes.fetch_add(1, Ordering::Relaxed);
        meter::add_stale_refreshes(1);
    }

    pub fn add_lock_contention(&self) {
        self.lock_contentions.fetch_add(1, Ordering::Relaxed);
        meter::add_lock_contentions(1);
    }

    pub fn add_throttle_event(&self) {
        self.throttle_events.fetch_add(1, Ordering::Relaxed);
        meter::add_throttle_events(1);
    }

    pub fn add_background_refresh(&self) {
        self.background_refreshes.fetch_add(1, Ordering::Relaxed);
        meter::add_background_refreshes(1);
    }

    pub fn add_background_refresh_error(&self) {
        self.background_refresh_errors.fetch_add(1, Ordering::Relaxed);
        meter::add_background_refresh_errors(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_refreshes: self.stale_refreshes.load(Ordering::Relaxed),
            lock_contentions: self.lock_contentions.load(Ordering::Relaxed),
            throttle_events: self.throttle_events.load(Ordering::Relaxed),
            background_refreshes: self.background_refreshes.load(Ordering::Relaxed),
            background_refresh_errors: self.background_refresh_errors.load(Ordering::Relaxed),
        }
    }
}
