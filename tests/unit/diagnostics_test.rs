//! Tests for diagnostic sinks

use prometheus_background_queue::core::{
    build_diagnostic_record, DiagnosticSink, InMemoryDiagnosticSink,
};

#[test]
fn test_in_memory_sink_records() {
    let sink = InMemoryDiagnosticSink::new(10);
    sink.record(build_diagnostic_record("enqueued", None, 1, None, None));
    sink.record(build_diagnostic_record(
        "faulted",
        None,
        0,
        Some(12),
        Some("boom".into()),
    ));

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].event, "enqueued");
    assert_eq!(records[0].queue_depth, 1);
    assert_eq!(records[1].elapsed_ms, Some(12));
    assert_eq!(records[1].detail.as_deref(), Some("boom"));
}

#[test]
fn test_in_memory_sink_is_bounded() {
    let sink = InMemoryDiagnosticSink::new(3);
    for depth in 0..5 {
        sink.record(build_diagnostic_record("enqueued", None, depth, None, None));
    }
    let depths: Vec<usize> = sink.records().iter().map(|r| r.queue_depth).collect();
    assert_eq!(depths, vec![2, 3, 4]);
}

#[test]
fn test_zero_capacity_sink_drops_everything() {
    let sink = InMemoryDiagnosticSink::new(0);
    sink.record(build_diagnostic_record("enqueued", None, 1, None, None));
    assert!(sink.records().is_empty());
}

#[test]
fn test_records_for_filters_by_event() {
    let sink = InMemoryDiagnosticSink::new(10);
    sink.record(build_diagnostic_record("enqueued", None, 1, None, None));
    sink.record(build_diagnostic_record("observer_fault", None, 1, None, Some("x".into())));
    sink.record(build_diagnostic_record("enqueued", None, 2, None, None));

    assert_eq!(sink.records_for("enqueued").len(), 2);
    assert_eq!(sink.records_for("observer_fault").len(), 1);
    assert!(sink.records_for("completed").is_empty());
}

#[test]
fn test_clone_shares_buffer() {
    let sink = InMemoryDiagnosticSink::new(10);
    let other = sink.clone();
    other.record(build_diagnostic_record("stopped", None, 0, None, None));
    assert_eq!(sink.records().len(), 1);
}

#[test]
fn test_record_serializes_to_json() {
    let record = build_diagnostic_record("disposed", None, 0, None, Some("discarded 2".into()));
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["event"], "disposed");
    assert_eq!(json["detail"], "discarded 2");
    assert!(json["work_item_id"].is_null());
}
