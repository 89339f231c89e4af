//! Unbounded FIFO of pending work items with a counting wake signal.
//!
//! Producers push from any thread; a single run loop waits on the wake signal
//! and pops. The wake signal is a `tokio::sync::Semaphore` with one permit
//! added per push, so the consumer never polls.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tokio::sync::Semaphore;

use crate::core::WorkItem;

/// Returned by [`WorkQueue::wait`] once the wake signal has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeClosed;

/// Multi-producer FIFO of [`WorkItem`]s.
pub struct WorkQueue {
    tx: Sender<WorkItem>,
    rx: Receiver<WorkItem>,
    wake: Semaphore,
}

impl WorkQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            wake: Semaphore::new(0),
        }
    }

    /// Append `item` to the tail and signal one wake-up.
    pub fn push(&self, item: WorkItem) {
        // The receiver lives as long as `self`, so the channel cannot be
        // disconnected here.
        if self.tx.send(item).is_ok() {
            self.wake.add_permits(1);
        }
    }

    /// Remove and return the head, if any.
    #[must_use]
    pub fn try_pop(&self) -> Option<WorkItem> {
        self.rx.try_recv().ok()
    }

    /// Wait for a wake-up. A wake-up does not guarantee a non-empty queue.
    ///
    /// # Errors
    ///
    /// Returns [`WakeClosed`] if the wake signal was closed before or during
    /// the wait.
    pub async fn wait(&self) -> Result<(), WakeClosed> {
        let permit = self.wake.acquire().await.map_err(|_| WakeClosed)?;
        permit.forget();
        Ok(())
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Remove every queued item.
    pub fn drain(&self) -> Vec<WorkItem> {
        self.rx.try_iter().collect()
    }

    /// Close the wake signal. Outstanding and future waits return
    /// [`WakeClosed`].
    pub fn close(&self) {
        self.wake.close();
    }

    /// True once [`WorkQueue::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.wake.is_closed()
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
