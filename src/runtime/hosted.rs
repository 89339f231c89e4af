//! Host adapter: starts the run loop with the host and stops it on teardown.
//!
//! The engine's `dispose` does not wait for anything. `HostedQueue::stop`
//! builds "stop and wait" from the run task's completion plus disposal.

use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::{AppResult, BackgroundQueue, QueueError, Spawn};
use crate::runtime::TokioSpawner;

/// A [`BackgroundQueue`] whose run loop is owned by the host.
pub struct HostedQueue<S = TokioSpawner> {
    queue: BackgroundQueue<S>,
    lifetime: CancellationToken,
    runner: Mutex<Option<JoinHandle<Result<(), QueueError>>>>,
}

impl<S> HostedQueue<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Spawn the run loop of `queue` on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails when called outside a tokio runtime.
    pub fn start(queue: BackgroundQueue<S>) -> AppResult<Self> {
        let handle = tokio::runtime::Handle::try_current()
            .context("hosted background queue requires a tokio runtime")?;
        let lifetime = CancellationToken::new();

        let runner = {
            let queue = queue.clone();
            let lifetime = lifetime.clone();
            handle.spawn(async move { queue.run(lifetime).await })
        };
        info!("hosted background queue started");

        Ok(Self {
            queue,
            lifetime,
            runner: Mutex::new(Some(runner)),
        })
    }

    /// The hosted queue.
    #[must_use]
    pub const fn queue(&self) -> &BackgroundQueue<S> {
        &self.queue
    }

    /// The host-shutdown signal passed to the run loop.
    #[must_use]
    pub const fn lifetime(&self) -> &CancellationToken {
        &self.lifetime
    }

    /// Signal host shutdown, wait up to `timeout` for the run loop to exit,
    /// then dispose the queue. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the run loop's error, or a join error if the run task
    /// panicked. The queue is disposed in every case.
    pub async fn stop(&self, timeout: Duration) -> AppResult<()> {
        self.lifetime.cancel();
        let runner = self.runner.lock().take();

        let result = match runner {
            Some(runner) => match tokio::time::timeout(timeout, runner).await {
                Ok(joined) => joined
                    .context("background queue run task failed")
                    .and_then(|run| run.map_err(anyhow::Error::from)),
                Err(_) => {
                    warn!(?timeout, "run loop did not stop within timeout");
                    Ok(())
                }
            },
            None => Ok(()),
        };

        self.queue.dispose();
        info!("hosted background queue stopped");
        result
    }
}

impl<S> Drop for HostedQueue<S> {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}
