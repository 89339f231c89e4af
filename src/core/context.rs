//! Ambient trace-context capture and restoration.
//!
//! A [`TraceContext`] is snapshotted when a work item is created and later
//! re-installed around the item's invocation, so spans and correlation ids
//! recorded by the body are attributed to the call that scheduled it.

use std::future::Future;

use tracing::{Instrument, Span};

tokio::task_local! {
    static AMBIENT: TraceContext;
}

/// Snapshot of the trace/correlation state active for a caller.
#[derive(Debug, Clone)]
pub struct TraceContext {
    span: Span,
    correlation_id: Option<String>,
}

impl TraceContext {
    /// Create a context with a correlation id, parented to the current span.
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            span: Span::current(),
            correlation_id: Some(correlation_id.into()),
        }
    }

    /// Snapshot the current span and any ambient correlation id.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            span: Span::current(),
            correlation_id: Self::current().and_then(|ctx| ctx.correlation_id),
        }
    }

    /// The context installed for the running task or closure, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        AMBIENT.try_with(Clone::clone).ok()
    }

    /// Replace the span carried by this context.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Span that invocations run inside.
    #[must_use]
    pub const fn span(&self) -> &Span {
        &self.span
    }

    /// Correlation id, if one was attached.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

/// Installs a captured context around an invocation and restores the
/// previously active one on every exit path.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextPropagator;

impl ContextPropagator {
    /// Run `fut` with `context` installed. `None` runs it untouched.
    pub async fn scope<F>(context: Option<TraceContext>, fut: F) -> F::Output
    where
        F: Future,
    {
        match context {
            Some(ctx) => {
                let span = ctx.span.clone();
                AMBIENT.scope(ctx, fut.instrument(span)).await
            }
            None => fut.await,
        }
    }

    /// Blocking counterpart of [`ContextPropagator::scope`].
    pub fn sync_scope<R, F>(context: Option<TraceContext>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        match context {
            Some(ctx) => {
                let span = ctx.span.clone();
                AMBIENT.sync_scope(ctx, || span.in_scope(f))
            }
            None => f(),
        }
    }
}
