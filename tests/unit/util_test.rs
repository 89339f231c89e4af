//! Tests for utility functions

use prometheus_background_queue::core::WorkItem;
use prometheus_background_queue::core::WorkBody;
use prometheus_background_queue::util::{init_tracing, init_tracing_with, now_ms, work_item_span};

#[test]
fn test_now_ms_is_monotonic_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(a > 0);
    assert!(b >= a);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    assert!(!init_tracing_with("debug"));
}

#[test]
fn test_work_item_span_metadata() {
    init_tracing();
    let item = WorkItem::new(WorkBody::sync(|_| Ok(()))).with_display_name("reindex");
    let span = work_item_span(item.meta());
    if let Some(meta) = span.metadata() {
        assert_eq!(meta.name(), "background_work");
    }
}
