//! Runtime spawning abstraction.

use std::future::Future;

/// Abstraction for spawning task execution on a runtime.
///
/// The engine hands every dequeued work item to `spawn` and never awaits the
/// result, so implementations must not block.
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
