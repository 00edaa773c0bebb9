// Durable refresh job queue and its worker pool.

pub mod queue;
pub mod worker;


// Re-export main types
pub use queue::{QueueStats, RefreshQueue, WorkerStatus};
pub use worker::WorkerPool;
