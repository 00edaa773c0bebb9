#[cfg(test)]
mod tests;

#[cfg(test)]
pub use tests::support;

pub mod app;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod freshness;
pub mod inspector;
pub mod metrics;
pub mod model;
pub mod queue;
pub mod registry;
pub mod shutdown;
pub mod store;
pub mod upstream;
