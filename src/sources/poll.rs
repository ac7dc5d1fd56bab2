//! Watching by periodic polling.

use super::{Change, Getter, KeyValue, WatchContext, Watcher};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Turns any [`Getter`] into a [`Watcher`] by polling it.
///
/// Each tick reads every watched key and emits one batch with the keys that
/// changed. When the backend reports a version it is used as is; when it
/// reports 0 (no versioning, e.g. plain Redis keys) a per-key counter is bumped
/// whenever the value differs from the last poll.
///
/// # Examples
///
/// ```rust
/// use fieldwatch::core::Source;
/// use fieldwatch::sources::{MemoryStore, PollingWatcher};
/// use std::time::Duration;
///
/// let store = MemoryStore::new(Source::Redis);
/// let watcher = PollingWatcher::new(store, Duration::from_millis(500));
/// assert_eq!(watcher.interval(), Duration::from_millis(500));
/// ```
pub struct PollingWatcher<G> {
    getter: Arc<G>,
    interval: Duration,
}

impl<G> PollingWatcher<G> {
    /// Poll `getter` every `interval`.
    pub fn new(getter: G, interval: Duration) -> Self {
        Self {
            getter: Arc::new(getter),
            interval,
        }
    }

    /// Interval between polls.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[derive(Debug, Default)]
struct Seen {
    value: Option<String>,
    backend_version: u64,
    emitted_version: u64,
}

impl Seen {
    /// Record a poll result and return the version to emit, if it changed.
    fn observe(&mut self, kv: &KeyValue) -> Option<u64> {
        let changed = if kv.version != 0 {
            kv.version > self.backend_version
        } else {
            self.value.as_deref() != Some(kv.value.as_str())
        };
        if !changed {
            return None;
        }

        self.value = Some(kv.value.clone());
        self.backend_version = kv.version;
        self.emitted_version = if kv.version != 0 {
            kv.version.max(self.emitted_version + 1)
        } else {
            self.emitted_version + 1
        };
        Some(self.emitted_version)
    }
}

#[async_trait]
impl<G> Watcher for PollingWatcher<G>
where
    G: Getter + 'static,
{
    async fn watch(&self, ctx: WatchContext) -> Result<()> {
        let getter = Arc::clone(&self.getter);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            let mut seen: HashMap<String, Seen> = HashMap::new();
            loop {
                tokio::select! {
                    biased;
                    _ = ctx.cancel().cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let mut batch = Vec::new();
                for item in ctx.items() {
                    match getter.get(item.key()).await {
                        Ok(Some(kv)) => {
                            let entry = seen.entry(item.key().to_string()).or_default();
                            if let Some(version) = entry.observe(&kv) {
                                batch.push(Change::new(ctx.source(), item.key(), kv.value, version));
                            }
                        }
                        Ok(None) => {
                            tracing::trace!(source = %ctx.source(), key = item.key(), "polled key is absent");
                        }
                        Err(err) => ctx.report(err).await,
                    }
                }

                if !ctx.send(batch).await {
                    break;
                }
            }
            tracing::debug!(source = %ctx.source(), "polling watcher stopped");
        });

        Ok(())
    }
}
