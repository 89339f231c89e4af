//! The background queue engine.
//!
//! A [`BackgroundQueue`] owns a [`WorkQueue`], accepts work from any number of
//! producers, and runs a single consumer loop that dequeues items in FIFO order
//! and hands each one to the spawner without waiting for it. Every invocation
//! observes a child of the union of the engine's disposal signal and the
//! lifetime signal passed to [`BackgroundQueue::run`].
//!
//! # Example
//!
//! ```rust,ignore
//! use prometheus_background_queue::core::{BackgroundQueue, WorkError};
//! use prometheus_background_queue::config::QueueConfig;
//! use prometheus_background_queue::runtime::TokioSpawner;
//! use tokio_util::sync::CancellationToken;
//!
//! let queue = BackgroundQueue::new(QueueConfig::default(), TokioSpawner::try_current()?)?;
//! let shutdown = CancellationToken::new();
//!
//! let runner = {
//!     let queue = queue.clone();
//!     let shutdown = shutdown.clone();
//!     tokio::spawn(async move { queue.run(shutdown).await })
//! };
//!
//! queue.enqueue_async(|cancel| async move {
//!     tokio::select! {
//!         _ = cancel.cancelled() => Err(WorkError::Cancelled),
//!         _ = send_email() => Ok(()),
//!     }
//! })?;
//!
//! shutdown.cancel();
//! runner.await??;
//! queue.dispose();
//! ```

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, Instrument};

use crate::config::{DisposedEnqueuePolicy, QueueConfig, SyncExecution};
use crate::core::work_item::{SyncWork, WorkItemParts};
use crate::core::{
    CancellationComposer, ContextPropagator, LifecycleDispatcher, LifecycleEvent, QueueError,
    Spawn, TraceContext, WorkBody, WorkError, WorkItem, WorkItemId, WorkItemMeta, WorkQueue,
};
use crate::runtime::TokioSpawner;
use crate::util::telemetry::work_item_span;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Run-loop state of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run loop active; `run` may be called.
    Idle,
    /// A run loop is active.
    Running,
    /// The queue has been disposed.
    Stopped,
}

/// Per-call options for [`BackgroundQueue::enqueue_with`].
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    display_name: Option<String>,
    linked_signals: Vec<CancellationToken>,
    capture_context: bool,
}

impl EnqueueOptions {
    /// Default options: unnamed, no extra signals, no context capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Label the item.
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Cancel the item when `signal` fires, in addition to the engine's
    /// disposal and lifetime signals.
    #[must_use]
    pub fn linked_signal(mut self, signal: CancellationToken) -> Self {
        self.linked_signals.push(signal);
        self
    }

    /// Add several linked signals.
    #[must_use]
    pub fn linked_signals(mut self, signals: impl IntoIterator<Item = CancellationToken>) -> Self {
        self.linked_signals.extend(signals);
        self
    }

    /// Capture the caller's trace context at enqueue time.
    #[must_use]
    pub const fn capture_context(mut self) -> Self {
        self.capture_context = true;
        self
    }
}

struct Shared {
    config: QueueConfig,
    state: AtomicU8,
    disposed: AtomicBool,
    queue: WorkQueue,
    disposal: CancellationToken,
    dispatcher: LifecycleDispatcher,
}

impl Shared {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.store(STOPPED, Ordering::Release);
        self.disposal.cancel();
        let discarded = self.discard_queued();
        self.queue.close();
        self.dispatcher.disposed(&discarded);
    }

    fn discard_queued(&self) -> Vec<WorkItemMeta> {
        self.queue
            .drain()
            .into_iter()
            .map(|item| item.meta().clone())
            .collect()
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Resets the run state and announces loop exit on every exit path,
/// including the run future being dropped.
struct RunGuard<'a> {
    shared: &'a Shared,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let _ = self.shared.state.compare_exchange(
            RUNNING,
            IDLE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.shared.dispatcher.stopped(self.shared.queue.len());
    }
}

/// Fire-and-forget background work scheduler.
///
/// Cloning yields another handle to the same queue. The queue is disposed
/// when [`BackgroundQueue::dispose`] is called or the last handle (including
/// those held by in-flight work) is dropped.
pub struct BackgroundQueue<S = TokioSpawner> {
    shared: Arc<Shared>,
    spawner: S,
}

impl<S: Clone> Clone for BackgroundQueue<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            spawner: self.spawner.clone(),
        }
    }
}

impl<S> std::fmt::Debug for BackgroundQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundQueue")
            .field("state", &self.run_state())
            .field("queued", &self.shared.queue.len())
            .field("dispatcher", &self.shared.dispatcher)
            .finish_non_exhaustive()
    }
}

impl<S> BackgroundQueue<S> {
    /// Create a queue without observers.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: QueueConfig, spawner: S) -> Result<Self, QueueError> {
        config.validate().map_err(QueueError::InvalidConfig)?;
        let dispatcher = LifecycleDispatcher::new(Vec::new(), None, config.event_channel_capacity);
        Ok(Self::from_parts(config, spawner, dispatcher))
    }

    pub(crate) fn from_parts(
        config: QueueConfig,
        spawner: S,
        dispatcher: LifecycleDispatcher,
    ) -> Self {
        info!(
            allow_registration_while_stopped = config.allow_registration_while_stopped,
            observers = dispatcher.observer_count(),
            "background queue initialized"
        );
        Self {
            shared: Arc::new(Shared {
                config,
                state: AtomicU8::new(IDLE),
                disposed: AtomicBool::new(false),
                queue: WorkQueue::new(),
                disposal: CancellationToken::new(),
                dispatcher,
            }),
            spawner,
        }
    }

    /// Enqueue a work item.
    ///
    /// Never blocks. Fires the `enqueued` hook before the item becomes
    /// visible to the run loop.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Disposed`] if the queue is disposed and the policy is
    ///   [`DisposedEnqueuePolicy::Reject`]
    /// - [`QueueError::NotRunning`] if no run loop is active and
    ///   registration while stopped is disallowed
    pub fn enqueue(&self, item: WorkItem) -> Result<WorkItemId, QueueError> {
        let shared = &self.shared;
        let id = item.id();

        if shared.disposed.load(Ordering::Acquire) {
            return match shared.config.after_dispose {
                DisposedEnqueuePolicy::Reject => Err(QueueError::Disposed),
                DisposedEnqueuePolicy::Ignore => {
                    debug!(work_item_id = %id, "ignoring enqueue on disposed background queue");
                    Ok(id)
                }
            };
        }

        if !shared.config.allow_registration_while_stopped
            && shared.state.load(Ordering::Acquire) != RUNNING
        {
            return Err(QueueError::NotRunning);
        }

        shared.dispatcher.enqueued(item.meta(), shared.queue.len() + 1);
        shared.queue.push(item);

        // Lost a race with dispose: its drain may have run before our push.
        if shared.disposed.load(Ordering::Acquire) {
            let discarded = shared.discard_queued();
            debug!(
                discarded = discarded.len(),
                "discarded work enqueued during disposal"
            );
            if shared.config.after_dispose == DisposedEnqueuePolicy::Reject {
                return Err(QueueError::Disposed);
            }
        }

        Ok(id)
    }

    /// Enqueue `body` with per-call options.
    ///
    /// # Errors
    ///
    /// See [`BackgroundQueue::enqueue`].
    pub fn enqueue_with(
        &self,
        body: WorkBody,
        options: EnqueueOptions,
    ) -> Result<WorkItemId, QueueError> {
        let EnqueueOptions {
            display_name,
            linked_signals,
            capture_context,
        } = options;

        let mut item = WorkItem::new(body).with_linked_signals(linked_signals);
        if let Some(name) = display_name {
            item = item.with_display_name(name);
        }
        if capture_context {
            item = item.with_captured_context();
        }
        self.enqueue(item)
    }

    /// Enqueue a synchronous closure.
    ///
    /// # Errors
    ///
    /// See [`BackgroundQueue::enqueue`].
    pub fn enqueue_sync<F>(&self, f: F) -> Result<WorkItemId, QueueError>
    where
        F: FnOnce(CancellationToken) -> Result<(), WorkError> + Send + 'static,
    {
        self.enqueue(WorkItem::new(WorkBody::sync(f)))
    }

    /// Enqueue a closure returning a future.
    ///
    /// # Errors
    ///
    /// See [`BackgroundQueue::enqueue`].
    pub fn enqueue_async<F, Fut>(&self, f: F) -> Result<WorkItemId, QueueError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
    {
        self.enqueue(WorkItem::new(WorkBody::future(f)))
    }

    /// True while a run loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) == RUNNING
    }

    /// True once disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    /// Current run state.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        match self.shared.state.load(Ordering::Acquire) {
            IDLE => RunState::Idle,
            RUNNING => RunState::Running,
            _ => RunState::Stopped,
        }
    }

    /// Items enqueued but not yet dequeued.
    #[must_use]
    pub fn queued_item_count(&self) -> usize {
        self.shared.queue.len()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Subscribe to lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<LifecycleEvent> {
        self.shared.dispatcher.subscribe()
    }

    /// Dispose the queue.
    ///
    /// Idempotent. Cancels in-flight and future invocations, discards queued
    /// items without firing completion hooks, and releases the wake signal.
    /// Does not wait for in-flight work.
    pub fn dispose(&self) {
        self.shared.dispose();
    }
}

impl<S> BackgroundQueue<S>
where
    S: Spawn,
{
    /// Run the dequeue loop until `lifetime` fires or the queue is disposed.
    ///
    /// # Errors
    ///
    /// - [`QueueError::AlreadyRunning`] if another run loop is active
    /// - [`QueueError::Disposed`] if the queue has been disposed
    /// - [`QueueError::Runtime`] if no tokio runtime is available
    pub async fn run(&self, lifetime: CancellationToken) -> Result<(), QueueError> {
        let shared = &*self.shared;

        if let Err(actual) =
            shared
                .state
                .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            return Err(if actual == STOPPED {
                QueueError::Disposed
            } else {
                QueueError::AlreadyRunning
            });
        }
        let _guard = RunGuard { shared };

        let scope =
            CancellationComposer::compose(&[shared.disposal.clone(), lifetime.clone()])?;
        info!(queued = shared.queue.len(), "background queue run loop started");

        loop {
            tokio::select! {
                biased;
                () = scope.token().cancelled() => {
                    debug!("run loop cancellation observed");
                    break;
                }
                woke = shared.queue.wait() => {
                    if woke.is_err() {
                        debug!("wake signal closed, stopping run loop");
                        break;
                    }
                }
            }

            let Some(item) = shared.queue.try_pop() else {
                trace!("spurious wake-up, queue empty");
                continue;
            };

            shared.dispatcher.dequeued(item.meta(), shared.queue.len());
            self.dispatch(item, &lifetime);
        }

        Ok(())
    }

    fn dispatch(&self, item: WorkItem, lifetime: &CancellationToken) {
        let shared = Arc::clone(&self.shared);
        let lifetime = lifetime.clone();
        self.spawner.spawn(invoke(shared, item, lifetime));
    }
}

async fn invoke(shared: Arc<Shared>, item: WorkItem, lifetime: CancellationToken) {
    let WorkItemParts {
        meta,
        body,
        context,
        linked_signals,
    } = item.into_parts();
    let mode = shared.config.sync_execution;

    ContextPropagator::scope(context, async move {
        shared.dispatcher.running(&meta, shared.queue.len());
        let started = Instant::now();

        let mut sources = Vec::with_capacity(linked_signals.len() + 2);
        sources.push(shared.disposal.clone());
        sources.push(lifetime);
        sources.extend(linked_signals);

        // Owned by the invocation, so it outlives the run loop that spawned it.
        let signal = match CancellationComposer::compose(&sources) {
            Ok(signal) => signal,
            Err(error) => {
                let error = WorkError::Failed(anyhow::Error::new(error));
                shared
                    .dispatcher
                    .faulted(&meta, shared.queue.len(), started.elapsed(), &error);
                return;
            }
        };
        let cancel = signal.token().clone();

        let outcome = execute(body, cancel.clone(), mode)
            .instrument(work_item_span(&meta))
            .await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(()) => shared.dispatcher.completed(&meta, shared.queue.len(), elapsed),
            Err(WorkError::Cancelled) if cancel.is_cancelled() => {
                debug!(work_item_id = %meta.id, "work item unwound on cancellation");
                shared.dispatcher.completed(&meta, shared.queue.len(), elapsed);
            }
            Err(error) => shared
                .dispatcher
                .faulted(&meta, shared.queue.len(), elapsed, &error),
        }
    })
    .await;
}

async fn execute(
    body: WorkBody,
    cancel: CancellationToken,
    mode: SyncExecution,
) -> Result<(), WorkError> {
    match body {
        WorkBody::Async(f) => AssertUnwindSafe(async move { f(cancel).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(WorkError::from_panic(payload.as_ref()))),
        WorkBody::Sync(f) => match mode {
            SyncExecution::Blocking => run_sync_blocking(f, cancel).await,
            SyncExecution::Inline => catch_unwind(AssertUnwindSafe(|| f(cancel)))
                .unwrap_or_else(|payload| Err(WorkError::from_panic(payload.as_ref()))),
        },
    }
}

/// Run a synchronous body on the blocking pool, carrying the ambient trace
/// context onto the blocking thread.
async fn run_sync_blocking(
    f: SyncWork,
    cancel: CancellationToken,
) -> Result<(), WorkError> {
    let context = TraceContext::current();
    match tokio::task::spawn_blocking(move || ContextPropagator::sync_scope(context, || f(cancel)))
        .await
    {
        Ok(outcome) => outcome,
        Err(join) if join.is_panic() => Err(WorkError::from_panic(join.into_panic().as_ref())),
        Err(_) => Err(WorkError::Cancelled),
    }
}
