//! Lifecycle hook dispatch with observer fault isolation.
//!
//! For each work item the engine fires, in order:
//! `enqueued -> dequeued -> running -> (completed | faulted)`.
//! Each stage is traced, recorded to the optional [`DiagnosticSink`],
//! published on a broadcast channel, and handed to every registered
//! [`LifecycleObserver`]. A panicking observer is logged and skipped; it never
//! reaches the engine or the other observers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::core::diagnostics::build_diagnostic_record;
use crate::core::error::panic_message;
use crate::core::{DiagnosticSink, WorkError, WorkItemMeta};
use crate::util::clock::now_ms;

/// Stage of a work item's progress, plus run-loop termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// Accepted by `enqueue`.
    Enqueued,
    /// Taken off the queue by the run loop.
    Dequeued,
    /// Body about to execute.
    Running,
    /// Body finished normally or via expected cancellation.
    Completed,
    /// Body failed.
    Faulted,
    /// A run loop exited.
    Stopped,
}

impl LifecycleStage {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Dequeued => "dequeued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Faulted => "faulted",
            Self::Stopped => "stopped",
        }
    }
}

/// Event published on the lifecycle broadcast channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Stage reached.
    pub stage: LifecycleStage,
    /// Item the event refers to; `None` for [`LifecycleStage::Stopped`].
    pub work_item: Option<WorkItemMeta>,
    /// Queue depth when the event was produced.
    pub queue_depth: usize,
    /// Queue wait (dequeued) or execution time (completed/faulted).
    pub elapsed_ms: Option<u128>,
    /// Error message for [`LifecycleStage::Faulted`].
    pub error: Option<String>,
}

/// Observer of work item progress. All methods default to no-ops.
///
/// Callbacks run on engine threads with no engine lock held.
pub trait LifecycleObserver: Send + Sync {
    /// Item accepted by `enqueue`.
    fn on_enqueued(&self, _item: &WorkItemMeta) {}
    /// Item taken off the queue.
    fn on_dequeued(&self, _item: &WorkItemMeta) {}
    /// Item body about to run.
    fn on_running(&self, _item: &WorkItemMeta) {}
    /// Item body finished without a fault.
    fn on_completed(&self, _item: &WorkItemMeta) {}
    /// Item body faulted.
    fn on_error(&self, _item: &WorkItemMeta, _error: &WorkError) {}
    /// A run loop exited.
    fn on_stopped(&self) {}
}

type ItemHook = Box<dyn Fn(&WorkItemMeta) + Send + Sync>;
type ErrorHook = Box<dyn Fn(&WorkItemMeta, &WorkError) + Send + Sync>;
type StopHook = Box<dyn Fn() + Send + Sync>;

/// Closure-based observer.
///
/// ```rust,ignore
/// let hooks = Hooks::new()
///     .on_completed(|item| println!("done: {}", item.label()))
///     .on_error(|item, err| eprintln!("{} failed: {err}", item.label()));
/// ```
#[derive(Default)]
pub struct Hooks {
    enqueued: Option<ItemHook>,
    dequeued: Option<ItemHook>,
    running: Option<ItemHook>,
    completed: Option<ItemHook>,
    error: Option<ErrorHook>,
    stopped: Option<StopHook>,
}

impl Hooks {
    /// Empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback for [`LifecycleStage::Enqueued`].
    #[must_use]
    pub fn on_enqueued(mut self, f: impl Fn(&WorkItemMeta) + Send + Sync + 'static) -> Self {
        self.enqueued = Some(Box::new(f));
        self
    }

    /// Callback for [`LifecycleStage::Dequeued`].
    #[must_use]
    pub fn on_dequeued(mut self, f: impl Fn(&WorkItemMeta) + Send + Sync + 'static) -> Self {
        self.dequeued = Some(Box::new(f));
        self
    }

    /// Callback for [`LifecycleStage::Running`].
    #[must_use]
    pub fn on_running(mut self, f: impl Fn(&WorkItemMeta) + Send + Sync + 'static) -> Self {
        self.running = Some(Box::new(f));
        self
    }

    /// Callback for [`LifecycleStage::Completed`].
    #[must_use]
    pub fn on_completed(mut self, f: impl Fn(&WorkItemMeta) + Send + Sync + 'static) -> Self {
        self.completed = Some(Box::new(f));
        self
    }

    /// Callback for [`LifecycleStage::Faulted`].
    #[must_use]
    pub fn on_error(
        mut self,
        f: impl Fn(&WorkItemMeta, &WorkError) + Send + Sync + 'static,
    ) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Callback for run-loop exit.
    #[must_use]
    pub fn on_stopped(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.stopped = Some(Box::new(f));
        self
    }
}

impl LifecycleObserver for Hooks {
    fn on_enqueued(&self, item: &WorkItemMeta) {
        if let Some(f) = &self.enqueued {
            f(item);
        }
    }

    fn on_dequeued(&self, item: &WorkItemMeta) {
        if let Some(f) = &self.dequeued {
            f(item);
        }
    }

    fn on_running(&self, item: &WorkItemMeta) {
        if let Some(f) = &self.running {
            f(item);
        }
    }

    fn on_completed(&self, item: &WorkItemMeta) {
        if let Some(f) = &self.completed {
            f(item);
        }
    }

    fn on_error(&self, item: &WorkItemMeta, error: &WorkError) {
        if let Some(f) = &self.error {
            f(item, error);
        }
    }

    fn on_stopped(&self) {
        if let Some(f) = &self.stopped {
            f();
        }
    }
}

/// Fans lifecycle stages out to tracing, diagnostics, subscribers and
/// observers.
pub struct LifecycleDispatcher {
    observers: Vec<Arc<dyn LifecycleObserver>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleDispatcher {
    /// Create a dispatcher. `event_capacity` must be non-zero.
    #[must_use]
    pub fn new(
        observers: Vec<Arc<dyn LifecycleObserver>>,
        diagnostics: Option<Arc<dyn DiagnosticSink>>,
        event_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            observers,
            diagnostics,
            events,
        }
    }

    /// Subscribe to the lifecycle event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Fire [`LifecycleStage::Enqueued`].
    pub fn enqueued(&self, item: &WorkItemMeta, queue_depth: usize) {
        debug!(
            work_item_id = %item.id,
            display_name = ?item.display_name,
            queue_depth,
            "work item enqueued"
        );
        self.publish(LifecycleStage::Enqueued, Some(item), queue_depth, None, None);
        self.notify(LifecycleStage::Enqueued, Some(item), queue_depth, |o| {
            o.on_enqueued(item);
        });
    }

    /// Fire [`LifecycleStage::Dequeued`]; elapsed is time spent queued.
    pub fn dequeued(&self, item: &WorkItemMeta, queue_depth: usize) {
        let waited = now_ms().saturating_sub(item.created_at_ms);
        debug!(
            work_item_id = %item.id,
            display_name = ?item.display_name,
            queue_depth,
            waited_ms = waited as u64,
            "work item dequeued"
        );
        self.publish(LifecycleStage::Dequeued, Some(item), queue_depth, Some(waited), None);
        self.notify(LifecycleStage::Dequeued, Some(item), queue_depth, |o| {
            o.on_dequeued(item);
        });
    }

    /// Fire [`LifecycleStage::Running`].
    pub fn running(&self, item: &WorkItemMeta, queue_depth: usize) {
        debug!(
            work_item_id = %item.id,
            display_name = ?item.display_name,
            queue_depth,
            "work item running"
        );
        self.publish(LifecycleStage::Running, Some(item), queue_depth, None, None);
        self.notify(LifecycleStage::Running, Some(item), queue_depth, |o| {
            o.on_running(item);
        });
    }

    /// Fire [`LifecycleStage::Completed`].
    pub fn completed(&self, item: &WorkItemMeta, queue_depth: usize, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis();
        info!(
            work_item_id = %item.id,
            display_name = ?item.display_name,
            elapsed_ms = elapsed_ms as u64,
            "work item completed"
        );
        self.publish(
            LifecycleStage::Completed,
            Some(item),
            queue_depth,
            Some(elapsed_ms),
            None,
        );
        self.notify(LifecycleStage::Completed, Some(item), queue_depth, |o| {
            o.on_completed(item);
        });
    }

    /// Fire [`LifecycleStage::Faulted`].
    pub fn faulted(
        &self,
        item: &WorkItemMeta,
        queue_depth: usize,
        elapsed: Duration,
        error: &WorkError,
    ) {
        let elapsed_ms = elapsed.as_millis();
        warn!(
            work_item_id = %item.id,
            display_name = ?item.display_name,
            elapsed_ms = elapsed_ms as u64,
            error = %error,
            "work item faulted"
        );
        self.publish(
            LifecycleStage::Faulted,
            Some(item),
            queue_depth,
            Some(elapsed_ms),
            Some(error.to_string()),
        );
        self.notify(LifecycleStage::Faulted, Some(item), queue_depth, |o| {
            o.on_error(item, error);
        });
    }

    /// Fire [`LifecycleStage::Stopped`].
    pub fn stopped(&self, queue_depth: usize) {
        info!(queue_depth, "background queue run loop stopped");
        self.publish(LifecycleStage::Stopped, None, queue_depth, None, None);
        self.notify(LifecycleStage::Stopped, None, queue_depth, |o| o.on_stopped());
    }

    /// Record disposal. Discarded items get no completion hooks.
    pub fn disposed(&self, discarded: &[WorkItemMeta]) {
        for item in discarded {
            debug!(
                work_item_id = %item.id,
                display_name = ?item.display_name,
                "discarded queued work item"
            );
        }
        info!(discarded = discarded.len(), "background queue disposed");
        self.record(build_diagnostic_record(
            "disposed",
            None,
            0,
            None,
            Some(format!("discarded {} queued item(s)", discarded.len())),
        ));
    }

    fn publish(
        &self,
        stage: LifecycleStage,
        item: Option<&WorkItemMeta>,
        queue_depth: usize,
        elapsed_ms: Option<u128>,
        error: Option<String>,
    ) {
        self.record(build_diagnostic_record(
            stage.as_str(),
            item,
            queue_depth,
            elapsed_ms,
            error.clone(),
        ));
        // No subscribers is not an error.
        let _ = self.events.send(LifecycleEvent {
            stage,
            work_item: item.cloned(),
            queue_depth,
            elapsed_ms,
            error,
        });
    }

    fn notify<F>(
        &self,
        stage: LifecycleStage,
        item: Option<&WorkItemMeta>,
        queue_depth: usize,
        f: F,
    ) where
        F: Fn(&dyn LifecycleObserver),
    {
        for observer in &self.observers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))) {
                let detail = panic_message(payload.as_ref())
                    .unwrap_or_else(|| "unspecified error".to_string());
                error!(
                    stage = stage.as_str(),
                    work_item_id = ?item.map(|m| m.id),
                    error = %detail,
                    "lifecycle observer panicked"
                );
                self.record(build_diagnostic_record(
                    "observer_fault",
                    item,
                    queue_depth,
                    None,
                    Some(format!("{}: {detail}", stage.as_str())),
                ));
            }
        }
    }

    fn record(&self, record: crate::core::DiagnosticRecord) {
        if let Some(sink) = &self.diagnostics {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sink.record(record))) {
                error!(
                    error = ?panic_message(payload.as_ref()),
                    "diagnostic sink panicked"
                );
            }
        }
    }
}

impl std::fmt::Debug for LifecycleDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleDispatcher")
            .field("observers", &self.observers.len())
            .field("diagnostics", &self.diagnostics.is_some())
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}
