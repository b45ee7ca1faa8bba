//! Report engine: dispatcher, worker pool, status tracker.

pub mod dispatcher;
pub mod pool;
pub mod tracker;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use pool::{JobQueue, PoolConfig, PoolHandle, WorkerPool};
pub use tracker::Tracker;
pub use worker::{RunOutcome, Worker};
