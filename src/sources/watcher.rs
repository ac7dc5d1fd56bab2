//! Traits implemented by configuration backends.

use super::{Change, Item, KeyValue};
use crate::core::Source;
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One-shot read of a key, used while seeding.
///
/// Implement this trait to seed fields from a backend (e.g. Consul, Vault,
/// Redis).
#[async_trait]
pub trait Getter: Send + Sync {
    /// Read the current value of `key`.
    ///
    /// Returns `Ok(None)` when the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or answers with an
    /// unusable payload.
    async fn get(&self, key: &str) -> Result<Option<KeyValue>>;
}

/// Live stream of changes for one source.
///
/// `watch` must spawn its background work and return; the spawned work emits
/// batches through [`WatchContext::send`] until the context is cancelled.
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Start watching the items in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if watching cannot be started; runtime failures after
    /// start go through [`WatchContext::report`] instead.
    async fn watch(&self, ctx: WatchContext) -> Result<()>;
}

/// Everything a watcher needs to feed the monitor.
#[derive(Clone)]
pub struct WatchContext {
    source: Source,
    items: Vec<Item>,
    cancel: CancellationToken,
    changes: mpsc::Sender<Vec<Change>>,
    errors: mpsc::Sender<(Source, ConfigError)>,
}

impl WatchContext {
    pub(crate) fn new(
        source: Source,
        items: Vec<Item>,
        cancel: CancellationToken,
        changes: mpsc::Sender<Vec<Change>>,
        errors: mpsc::Sender<(Source, ConfigError)>,
    ) -> Self {
        Self {
            source,
            items,
            cancel,
            changes,
            errors,
        }
    }

    /// Source this watcher serves.
    pub fn source(&self) -> Source {
        self.source
    }

    /// Items to follow; all belong to [`WatchContext::source`].
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Token cancelled when the monitor stops.
    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the monitor has asked watchers to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Deliver a batch of changes. Empty batches are not sent.
    ///
    /// Returns `false` once the monitor is gone or cancelled; the watcher
    /// should stop then.
    pub async fn send(&self, batch: Vec<Change>) -> bool {
        if batch.is_empty() {
            return !self.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.changes.send(batch) => sent.is_ok(),
        }
    }

    /// Report a runtime failure without stopping.
    pub async fn report(&self, error: ConfigError) {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            _ = self.errors.send((self.source, error)) => {}
        }
    }

    #[cfg(test)]
    pub(crate) fn detached(source: Source, items: Vec<Item>) -> (Self, mpsc::Receiver<Vec<Change>>, mpsc::Receiver<(Source, ConfigError)>) {
        let (changes, changes_rx) = mpsc::channel(16);
        let (errors, errors_rx) = mpsc::channel(16);
        (
            Self::new(source, items, CancellationToken::new(), changes, errors),
            changes_rx,
            errors_rx,
        )
    }
}
