//! Tests for error types

use prometheus_background_queue::core::{QueueError, WorkError};

#[test]
fn test_already_running_error() {
    let err = QueueError::AlreadyRunning;
    assert_eq!(format!("{}", err), "background queue is already running");
}

#[test]
fn test_not_running_error() {
    let err = QueueError::NotRunning;
    assert_eq!(format!("{}", err), "background queue is not running");
}

#[test]
fn test_disposed_error() {
    let err = QueueError::Disposed;
    assert_eq!(format!("{}", err), "background queue has been disposed");
}

#[test]
fn test_invalid_config_error() {
    let err = QueueError::InvalidConfig("capacity is zero".to_string());
    assert_eq!(format!("{}", err), "invalid configuration: capacity is zero");
}

#[test]
fn test_runtime_error() {
    let err = QueueError::Runtime("no reactor".to_string());
    assert_eq!(format!("{}", err), "runtime error: no reactor");
}

#[test]
fn test_work_error_display() {
    assert_eq!(WorkError::Cancelled.to_string(), "work cancelled");
    assert_eq!(WorkError::Unspecified.to_string(), "unspecified error");
    assert_eq!(
        WorkError::Panicked("index out of bounds".into()).to_string(),
        "work panicked: index out of bounds"
    );
}

#[test]
fn test_work_error_from_anyhow_is_transparent() {
    let err: WorkError = anyhow::anyhow!("smtp connection refused").into();
    assert_eq!(err.to_string(), "smtp connection refused");
    assert!(!err.is_cancelled());
    assert!(WorkError::Cancelled.is_cancelled());
}

#[test]
fn test_work_error_failed_downcast() {
    #[derive(Debug, thiserror::Error)]
    #[error("invalid operation: {0}")]
    struct InvalidOperation(&'static str);

    let err = WorkError::Failed(InvalidOperation("fail").into());
    match err {
        WorkError::Failed(inner) => {
            let op = inner.downcast_ref::<InvalidOperation>().unwrap();
            assert_eq!(op.0, "fail");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_queue_error_into_anyhow() {
    let err: anyhow::Error = QueueError::Disposed.into();
    assert_eq!(err.downcast_ref::<QueueError>(), Some(&QueueError::Disposed));
}
