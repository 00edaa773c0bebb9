//! Prometheus metrics functionality.
//!
//! Metrics organization:
//! - Cache coordination counters: metrics::counters (hits, contentions, ...)
//! - Prometheus export: meter helpers over the global recorder, rendered
//!   by controller::metrics.

pub mod counters;
pub mod meter;

// Re-export commonly used items
pub use counters::{CacheMetrics, MetricsSnapshot};
pub use meter::*;
