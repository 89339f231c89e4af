//! Configuration models for the background queue.

pub mod queue;

pub use queue::{DisposedEnqueuePolicy, QueueConfig, SyncExecution, ENV_PREFIX};
