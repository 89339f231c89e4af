//! Builder to construct a background queue from configuration.

use std::sync::Arc;

use crate::config::QueueConfig;
use crate::core::{
    BackgroundQueue, DiagnosticSink, Hooks, LifecycleDispatcher, LifecycleObserver, QueueError,
};
use crate::runtime::TokioSpawner;

/// Assembles config, observers, hooks and a diagnostic sink into a
/// [`BackgroundQueue`].
///
/// ```rust,ignore
/// let queue = BackgroundQueueBuilder::new()
///     .config(QueueConfig::from_env()?)
///     .hooks(Hooks::new().on_error(|item, err| alert(item, err)))
///     .diagnostics(Arc::new(InMemoryDiagnosticSink::new(1024)))
///     .build()?;
/// ```
#[derive(Default)]
pub struct BackgroundQueueBuilder {
    config: QueueConfig,
    observers: Vec<Arc<dyn LifecycleObserver>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl BackgroundQueueBuilder {
    /// Builder with default configuration and no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration.
    #[must_use]
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an observer. Observers are notified in registration order.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Register closure hooks.
    #[must_use]
    pub fn hooks(self, hooks: Hooks) -> Self {
        self.observer(Arc::new(hooks))
    }

    /// Attach a diagnostic sink.
    #[must_use]
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Build a queue that spawns work on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`QueueError::InvalidConfig`] if the configuration is invalid
    /// - [`QueueError::Runtime`] when called outside a tokio runtime
    pub fn build(self) -> Result<BackgroundQueue<TokioSpawner>, QueueError> {
        let spawner = TokioSpawner::try_current()?;
        self.build_with(spawner)
    }

    /// Build a queue with an explicit spawner.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] if the configuration is invalid.
    pub fn build_with<S>(self, spawner: S) -> Result<BackgroundQueue<S>, QueueError> {
        self.config
            .validate()
            .map_err(|e| QueueError::InvalidConfig(format!("config invalid: {e}")))?;

        let dispatcher = LifecycleDispatcher::new(
            self.observers,
            self.diagnostics,
            self.config.event_channel_capacity,
        );
        Ok(BackgroundQueue::from_parts(self.config, spawner, dispatcher))
    }
}
