//! # Prometheus Background Queue
//!
//! A fire-and-forget background work scheduler for long-lived host processes.
//!
//! Producers enqueue units of work from any thread without blocking. A single
//! run loop dequeues items in FIFO order and starts each one on the runtime
//! without waiting for it, so many items may be in flight at once. Every item
//! observes a cancellation signal composed from the host's shutdown signal,
//! the queue's own disposal signal, and any per-item signals supplied at
//! enqueue time.
//!
//! ## Key Features
//!
//! - **Non-blocking enqueue**: Lock-free FIFO plus a counting wake signal
//! - **Concurrent execution**: Items are launched, never awaited, by the loop
//! - **Composed cancellation**: Host, disposal and per-item signals in one token
//! - **Lifecycle hooks**: enqueued, dequeued, running, completed, error, stopped
//! - **Fault isolation**: Panicking work or observers never stop the loop
//! - **Ambient trace context**: Optionally carried from producer to work item
//!
//! ```rust,ignore
//! use prometheus_background_queue::builders::BackgroundQueueBuilder;
//! use prometheus_background_queue::core::Hooks;
//! use prometheus_background_queue::runtime::HostedQueue;
//! use std::time::Duration;
//!
//! let queue = BackgroundQueueBuilder::new()
//!     .hooks(Hooks::new().on_error(|item, err| tracing::error!(%item.id, %err, "job failed")))
//!     .build()?;
//! let hosted = HostedQueue::start(queue)?;
//!
//! hosted.queue().enqueue_async(|_cancel| async move {
//!     refresh_cache().await;
//!     Ok(())
//! })?;
//!
//! hosted.stop(Duration::from_secs(5)).await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Work items, the FIFO queue, cancellation, context and the run loop.
pub mod core;
/// Queue configuration and environment loading.
pub mod config;
/// Builders to construct a queue from configuration and observers.
pub mod builders;
/// Runtime adapters: tokio spawner and host integration.
pub mod runtime;
/// Shared utilities.
pub mod util;
