//! Error types for queue operations and work-item outcomes.

use thiserror::Error;

/// Synchronous state errors surfaced to callers of `enqueue` and `run`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// A run loop is already active on this queue.
    #[error("background queue is already running")]
    AlreadyRunning,
    /// Enqueue was rejected because no run loop is active.
    #[error("background queue is not running")]
    NotRunning,
    /// The queue has been disposed.
    #[error("background queue has been disposed")]
    Disposed,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The async runtime was unavailable or failed.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Outcome errors raised by a work-item body.
///
/// Only [`WorkError::Cancelled`] observed while the item's composed signal has
/// fired counts as a normal completion; everything else is a fault.
#[derive(Debug, Error)]
pub enum WorkError {
    /// The body unwound because its cancellation signal fired.
    #[error("work cancelled")]
    Cancelled,
    /// The body panicked with a message.
    #[error("work panicked: {0}")]
    Panicked(String),
    /// The body failed without any usable error information.
    #[error("unspecified error")]
    Unspecified,
    /// The body returned an error.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl WorkError {
    /// Build a `WorkError` from a caught panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        panic_message(payload).map_or(Self::Unspecified, Self::Panicked)
    }

    /// True if this error is the conventional cancellation unwind.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Extract the message carried by a panic payload, if any.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> Option<String> {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        Some((*msg).to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
