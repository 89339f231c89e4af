//! Tests for configuration parsing

use prometheus_background_queue::config::{DisposedEnqueuePolicy, QueueConfig, SyncExecution};

#[test]
fn test_default_config() {
    let cfg = QueueConfig::default();
    assert!(cfg.allow_registration_while_stopped);
    assert_eq!(cfg.after_dispose, DisposedEnqueuePolicy::Reject);
    assert_eq!(cfg.sync_execution, SyncExecution::Blocking);
    assert_eq!(cfg.event_channel_capacity, 256);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "allow_registration_while_stopped": false,
        "after_dispose": "ignore",
        "sync_execution": "inline",
        "event_channel_capacity": 64
    }"#;

    let cfg = QueueConfig::from_json_str(json).unwrap();
    assert!(!cfg.allow_registration_while_stopped);
    assert_eq!(cfg.after_dispose, DisposedEnqueuePolicy::Ignore);
    assert_eq!(cfg.sync_execution, SyncExecution::Inline);
    assert_eq!(cfg.event_channel_capacity, 64);
}

#[test]
fn test_partial_json_keeps_defaults() {
    let cfg = QueueConfig::from_json_str(r#"{"after_dispose": "ignore"}"#).unwrap();
    assert!(cfg.allow_registration_while_stopped);
    assert_eq!(cfg.after_dispose, DisposedEnqueuePolicy::Ignore);
    assert_eq!(cfg.event_channel_capacity, 256);
}

#[test]
fn test_config_validation() {
    let cfg = QueueConfig {
        event_channel_capacity: 0,
        ..QueueConfig::default()
    };
    assert!(cfg.validate().is_err());
    assert!(QueueConfig::from_json_str(r#"{"event_channel_capacity": 0}"#).is_err());
}

#[test]
fn test_invalid_json() {
    let err = QueueConfig::from_json_str("{not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_unknown_policy_rejected() {
    assert!(QueueConfig::from_json_str(r#"{"after_dispose": "panic"}"#).is_err());
}

#[test]
fn test_config_round_trips_through_json() {
    let cfg = QueueConfig {
        sync_execution: SyncExecution::Inline,
        ..QueueConfig::default()
    };
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("\"inline\""));
    assert_eq!(QueueConfig::from_json_str(&json).unwrap(), cfg);
}
