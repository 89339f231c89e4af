//! Core scheduling engine: work items, queue, run loop, cancellation,
//! context propagation and lifecycle dispatch.

pub mod error;
pub mod work_item;
pub mod work_queue;
pub mod cancellation;
pub mod context;
pub mod diagnostics;
pub mod lifecycle;
pub mod spawn;
pub mod engine;

pub use error::{AppResult, QueueError, WorkError};
pub use work_item::{
    AsyncWork, BackgroundWork, SyncWork, WorkBody, WorkItem, WorkItemId, WorkItemMeta,
};
pub use work_queue::{WakeClosed, WorkQueue};
pub use cancellation::{CancellationComposer, ComposedSignal};
pub use context::{ContextPropagator, TraceContext};
pub use diagnostics::{
    build_diagnostic_record, DiagnosticRecord, DiagnosticSink, InMemoryDiagnosticSink,
};
pub use lifecycle::{
    Hooks, LifecycleDispatcher, LifecycleEvent, LifecycleObserver, LifecycleStage,
};
pub use spawn::Spawn;
pub use engine::{BackgroundQueue, EnqueueOptions, RunState};
