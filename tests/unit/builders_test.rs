//! Tests for builder modules

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use prometheus_background_queue::builders::BackgroundQueueBuilder;
use prometheus_background_queue::config::QueueConfig;
use prometheus_background_queue::core::{
    DiagnosticSink, Hooks, InMemoryDiagnosticSink, QueueError, RunState,
};
use prometheus_background_queue::runtime::TokioSpawner;

#[test]
fn test_build_outside_runtime_fails() {
    let err = BackgroundQueueBuilder::new().build().unwrap_err();
    assert!(matches!(err, QueueError::Runtime(_)));
}

#[test]
fn test_build_rejects_invalid_config() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = BackgroundQueueBuilder::new()
        .config(QueueConfig {
            event_channel_capacity: 0,
            ..QueueConfig::default()
        })
        .build_with(TokioSpawner::new(rt.handle().clone()))
        .unwrap_err();
    match err {
        QueueError::InvalidConfig(msg) => assert!(msg.starts_with("config invalid")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_builder_wires_hooks_and_diagnostics() {
    let enqueued = Arc::new(AtomicUsize::new(0));
    let sink = InMemoryDiagnosticSink::new(64);

    let queue = {
        let enqueued = Arc::clone(&enqueued);
        BackgroundQueueBuilder::new()
            .hooks(Hooks::new().on_enqueued(move |_| {
                enqueued.fetch_add(1, Ordering::SeqCst);
            }))
            .diagnostics(Arc::new(sink.clone()) as Arc<dyn DiagnosticSink>)
            .build()
            .unwrap()
    };

    assert_eq!(queue.run_state(), RunState::Idle);
    queue.enqueue_sync(|_| Ok(())).unwrap();
    queue.enqueue_sync(|_| Ok(())).unwrap();

    assert_eq!(enqueued.load(Ordering::SeqCst), 2);
    assert_eq!(sink.records_for("enqueued").len(), 2);
    assert_eq!(queue.queued_item_count(), 2);
}

#[tokio::test]
async fn test_builder_applies_config() {
    let queue = BackgroundQueueBuilder::new()
        .config(QueueConfig {
            allow_registration_while_stopped: false,
            ..QueueConfig::default()
        })
        .build()
        .unwrap();

    assert!(!queue.config().allow_registration_while_stopped);
    assert_eq!(queue.enqueue_sync(|_| Ok(())), Err(QueueError::NotRunning));
}
