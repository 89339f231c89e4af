//! Work items: one schedulable unit of background work plus its metadata.

use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::{TraceContext, WorkError};
use crate::util::clock::now_ms;

/// Opaque unique identifier of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(Uuid);

impl WorkItemId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WorkItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Metadata describing a work item. This is what observers receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemMeta {
    /// Unique identifier, stable for the item's lifetime.
    pub id: WorkItemId,
    /// Optional human-readable label.
    pub display_name: Option<String>,
    /// Creation timestamp in milliseconds since epoch.
    pub created_at_ms: u128,
}

impl WorkItemMeta {
    fn new() -> Self {
        Self {
            id: WorkItemId::new(),
            display_name: None,
            created_at_ms: now_ms(),
        }
    }

    /// Display name, or the id when no name was given.
    #[must_use]
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Synchronous body: runs to completion on the thread that invokes it.
pub type SyncWork = Box<dyn FnOnce(CancellationToken) -> Result<(), WorkError> + Send + 'static>;

/// Asynchronous body: produces a future the engine drives to completion.
pub type AsyncWork = Box<
    dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<(), WorkError>> + Send + 'static,
>;

/// The executable part of a work item. Exactly one variant is always present.
pub enum WorkBody {
    /// Blocking procedure.
    Sync(SyncWork),
    /// Future-returning procedure.
    Async(AsyncWork),
}

impl WorkBody {
    /// Wrap a synchronous closure.
    pub fn sync<F>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Result<(), WorkError> + Send + 'static,
    {
        Self::Sync(Box::new(f))
    }

    /// Wrap a closure returning a future.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
    {
        Self::Async(Box::new(move |cancel| Box::pin(f(cancel))))
    }

    /// Wrap a [`BackgroundWork`] implementor.
    pub fn from_work<W>(work: W) -> Self
    where
        W: BackgroundWork,
    {
        Self::future(move |cancel| Box::new(work).execute(cancel))
    }

    /// True for the asynchronous variant.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl fmt::Debug for WorkBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("WorkBody::Sync(..)"),
            Self::Async(_) => f.write_str("WorkBody::Async(..)"),
        }
    }
}

/// Trait-based alternative to closure bodies.
///
/// ```rust,ignore
/// struct Reindex { shard: u32 }
///
/// #[async_trait]
/// impl BackgroundWork for Reindex {
///     async fn execute(self: Box<Self>, cancel: CancellationToken) -> Result<(), WorkError> {
///         tokio::select! {
///             _ = cancel.cancelled() => Err(WorkError::Cancelled),
///             () = reindex(self.shard) => Ok(()),
///         }
///     }
/// }
///
/// queue.enqueue(WorkItem::new(WorkBody::from_work(Reindex { shard: 3 })))?;
/// ```
#[async_trait]
pub trait BackgroundWork: Send + 'static {
    /// Run the work, observing `cancel`.
    async fn execute(self: Box<Self>, cancel: CancellationToken) -> Result<(), WorkError>;
}

/// A unit of work ready to be enqueued.
///
/// Items compare and hash by id only.
pub struct WorkItem {
    meta: WorkItemMeta,
    body: WorkBody,
    context: Option<TraceContext>,
    linked_signals: Vec<CancellationToken>,
}

/// Owned pieces of a [`WorkItem`] handed to an invocation.
pub(crate) struct WorkItemParts {
    pub(crate) meta: WorkItemMeta,
    pub(crate) body: WorkBody,
    pub(crate) context: Option<TraceContext>,
    pub(crate) linked_signals: Vec<CancellationToken>,
}

impl WorkItem {
    /// Create an item with a fresh id and no captured context.
    #[must_use]
    pub fn new(body: WorkBody) -> Self {
        Self {
            meta: WorkItemMeta::new(),
            body,
            context: None,
            linked_signals: Vec::new(),
        }
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.meta.display_name = Some(name.into());
        self
    }

    /// Capture the caller's ambient trace context now.
    #[must_use]
    pub fn with_captured_context(mut self) -> Self {
        self.context = Some(TraceContext::capture());
        self
    }

    /// Attach an explicit trace context.
    #[must_use]
    pub fn with_context(mut self, context: TraceContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Cancel the item when `signal` fires, in addition to the engine's
    /// disposal and lifetime signals.
    #[must_use]
    pub fn with_linked_signal(mut self, signal: CancellationToken) -> Self {
        self.linked_signals.push(signal);
        self
    }

    /// Add several linked signals.
    #[must_use]
    pub fn with_linked_signals(
        mut self,
        signals: impl IntoIterator<Item = CancellationToken>,
    ) -> Self {
        self.linked_signals.extend(signals);
        self
    }

    /// Item id.
    #[must_use]
    pub const fn id(&self) -> WorkItemId {
        self.meta.id
    }

    /// Item metadata.
    #[must_use]
    pub const fn meta(&self) -> &WorkItemMeta {
        &self.meta
    }

    /// Captured trace context, if any.
    #[must_use]
    pub const fn captured_context(&self) -> Option<&TraceContext> {
        self.context.as_ref()
    }

    /// Body variant.
    #[must_use]
    pub const fn body(&self) -> &WorkBody {
        &self.body
    }

    /// Extra signals this item observes.
    #[must_use]
    pub fn linked_signals(&self) -> &[CancellationToken] {
        &self.linked_signals
    }

    pub(crate) fn into_parts(self) -> WorkItemParts {
        WorkItemParts {
            meta: self.meta,
            body: self.body,
            context: self.context,
            linked_signals: self.linked_signals,
        }
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.meta.id)
            .field("display_name", &self.meta.display_name)
            .field("body", &self.body)
            .field("has_context", &self.context.is_some())
            .field("linked_signals", &self.linked_signals.len())
            .finish()
    }
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.meta.id == other.meta.id
    }
}

impl Eq for WorkItem {}

impl Hash for WorkItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.id.hash(state);
    }
}
