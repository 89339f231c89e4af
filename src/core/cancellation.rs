//! Composition of independent cancellation sources into one derived signal.
//!
//! The run loop composes the engine's disposal signal with its lifetime
//! signal. Every invocation composes its own signal from disposal, lifetime
//! and the item's linked signals, so a body only ever observes a single token
//! and that token stays linked after the run loop that dispatched it is gone.

use futures::future::select_all;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::core::QueueError;

/// Builds union signals over any number of cancellation sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancellationComposer;

impl CancellationComposer {
    /// Compose `sources` into a signal that fires when any of them fires.
    ///
    /// The first source is linked as a parent; the remaining ones are watched
    /// by a single background task that exits when the returned signal is
    /// dropped or fires. Must be called from within a tokio runtime when more
    /// than one source is given.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Runtime`] if a watcher task is needed and no
    /// tokio runtime is available.
    pub fn compose(sources: &[CancellationToken]) -> Result<ComposedSignal, QueueError> {
        let release = CancellationToken::new();
        let Some((first, rest)) = sources.split_first() else {
            return Ok(ComposedSignal {
                token: CancellationToken::new(),
                release,
            });
        };

        let token = first.child_token();
        let pending: Vec<CancellationToken> = rest
            .iter()
            .filter(|source| !source.is_cancelled())
            .cloned()
            .collect();

        if pending.len() < rest.len() {
            token.cancel();
        } else if !pending.is_empty() && !token.is_cancelled() {
            let handle = tokio::runtime::Handle::try_current()
                .map_err(|e| QueueError::Runtime(e.to_string()))?;
            let target = token.clone();
            let released = release.clone();
            handle.spawn(async move {
                let any = select_all(pending.iter().map(|source| Box::pin(source.cancelled())));
                tokio::select! {
                    _ = any => {
                        trace!("linked cancellation source fired");
                        target.cancel();
                    }
                    () = target.cancelled() => {}
                    () = released.cancelled() => {}
                }
            });
        }

        Ok(ComposedSignal { token, release })
    }
}

/// Derived signal produced by [`CancellationComposer::compose`].
///
/// Dropping it releases the watcher task; it does not cancel the token.
#[derive(Debug)]
pub struct ComposedSignal {
    token: CancellationToken,
    release: CancellationToken,
}

impl ComposedSignal {
    /// The derived token.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once any source has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ComposedSignal {
    fn drop(&mut self) {
        self.release.cancel();
    }
}
