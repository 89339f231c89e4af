//! Background queue configuration.

use std::env;

use serde::{Deserialize, Serialize};

/// Environment variable prefix read by [`QueueConfig::from_env`].
pub const ENV_PREFIX: &str = "BACKGROUND_QUEUE_";

/// Behaviour of `enqueue` after the queue has been disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposedEnqueuePolicy {
    /// Fail with a state error.
    #[default]
    Reject,
    /// Accept and silently drop the item.
    Ignore,
}

/// Where synchronous bodies execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncExecution {
    /// On the tokio blocking thread pool.
    #[default]
    Blocking,
    /// Directly on the dispatched async task.
    Inline,
}

/// Queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Accept work while no run loop is active. When false, `enqueue` on a
    /// non-running queue fails.
    pub allow_registration_while_stopped: bool,
    /// Behaviour of `enqueue` after disposal.
    pub after_dispose: DisposedEnqueuePolicy,
    /// Where synchronous bodies execute.
    pub sync_execution: SyncExecution,
    /// Capacity of the lifecycle event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            allow_registration_while_stopped: true,
            after_dispose: DisposedEnqueuePolicy::Reject,
            sync_execution: SyncExecution::Blocking,
            event_channel_capacity: 256,
        }
    }
}

impl QueueConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `BACKGROUND_QUEUE_*` environment variables,
    /// reading a `.env` file first if one exists. Unset variables keep their
    /// defaults.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(raw) = var("ALLOW_REGISTRATION_WHILE_STOPPED") {
            cfg.allow_registration_while_stopped = parse_bool(&raw).ok_or_else(|| {
                format!("invalid boolean for ALLOW_REGISTRATION_WHILE_STOPPED: {raw}")
            })?;
        }
        if let Some(raw) = var("AFTER_DISPOSE") {
            cfg.after_dispose = match raw.trim().to_ascii_lowercase().as_str() {
                "reject" => DisposedEnqueuePolicy::Reject,
                "ignore" => DisposedEnqueuePolicy::Ignore,
                other => return Err(format!("invalid AFTER_DISPOSE policy: {other}")),
            };
        }
        if let Some(raw) = var("SYNC_EXECUTION") {
            cfg.sync_execution = match raw.trim().to_ascii_lowercase().as_str() {
                "blocking" => SyncExecution::Blocking,
                "inline" => SyncExecution::Inline,
                other => return Err(format!("invalid SYNC_EXECUTION mode: {other}")),
            };
        }
        if let Some(raw) = var("EVENT_CHANNEL_CAPACITY") {
            cfg.event_channel_capacity = raw
                .trim()
                .parse()
                .map_err(|e| format!("invalid EVENT_CHANNEL_CAPACITY: {e}"))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
