//! Integration tests for adsync.
//!
//! End-to-end tests for the coordination layer: freshness-driven reads,
//! lock/backoff behavior under concurrency, the job queue and the HTTP
//! operational surface.

mod cases_queue_workers_test;
mod cases_http_test;

pub mod support;
