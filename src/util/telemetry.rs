//! Telemetry helpers for structured logging and tracing.

use tracing::{info_span, Span};
use tracing_subscriber::EnvFilter;

use crate::core::WorkItemMeta;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "prometheus_background_queue=info";

/// Initialize tracing/telemetry. Users can install their own subscriber; this
/// helper installs a default env-based subscriber if none is set.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_FILTER);
}

/// Like [`init_tracing`], falling back to `default_directive` when `RUST_LOG`
/// is unset or invalid. Returns true if this call installed the subscriber.
pub fn init_tracing_with(default_directive: &str) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

/// Span wrapping one work item invocation.
#[must_use]
pub fn work_item_span(item: &WorkItemMeta) -> Span {
    info_span!(
        "background_work",
        work_item_id = %item.id,
        display_name = ?item.display_name,
    )
}
