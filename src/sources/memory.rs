//! In-process key/value backend.

use super::{Change, Getter, KeyValue, WatchContext, Watcher};
use crate::core::Source;
use crate::error::{ConfigError, Result};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Default capacity of the update broadcast channel.
pub const DEFAULT_UPDATE_CAPACITY: usize = 128;

/// A key/value store living in memory, standing in for an external backend.
///
/// Every write bumps a store-wide modify index (like Consul's) that becomes the
/// version of the written keys. The store is both a [`Getter`] and a push-based
/// [`Watcher`]; clones share the same data. A watcher first emits the current
/// values of its keys, then every later write.
///
/// # Examples
///
/// ```rust
/// use fieldwatch::core::Source;
/// use fieldwatch::sources::{Getter, MemoryStore};
///
/// # async fn example() -> fieldwatch::error::Result<()> {
/// let store = MemoryStore::new(Source::Consul);
/// store.put("app/port", "8080");
///
/// let kv = store.get("app/port").await?.unwrap();
/// assert_eq!(kv.value, "8080");
/// assert_eq!(kv.version, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    source: Source,
    entries: ArcSwap<HashMap<String, KeyValue>>,
    index: Mutex<u64>,
    updates: broadcast::Sender<Vec<Change>>,
}

impl MemoryStore {
    /// Create an empty store that emits changes tagged with `source`.
    pub fn new(source: Source) -> Self {
        Self::with_capacity(source, DEFAULT_UPDATE_CAPACITY)
    }

    /// Create an empty store with a custom update channel capacity.
    ///
    /// Watchers that fall further behind than `capacity` batches resynchronize
    /// from the current snapshot.
    pub fn with_capacity(source: Source, capacity: usize) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                source,
                entries: ArcSwap::from_pointee(HashMap::new()),
                index: Mutex::new(0),
                updates: broadcast::channel(capacity.max(1)).0,
            }),
        }
    }

    /// Source tag of emitted changes.
    pub fn source(&self) -> Source {
        self.inner.source
    }

    /// Current modify index.
    pub fn index(&self) -> u64 {
        *self.inner.index.lock()
    }

    /// Write one key and return its new version.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> u64 {
        self.put_many([(key.into(), value.into())])
    }

    /// Write several keys atomically, emitting them as one batch.
    ///
    /// All written keys share the returned version.
    pub fn put_many<I, K, V>(&self, pairs: I) -> u64
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut index = self.inner.index.lock();
        *index += 1;
        let version = *index;

        let mut next = HashMap::clone(&self.inner.entries.load());
        let mut batch = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            batch.push(Change::new(self.inner.source, key.clone(), value.clone(), version));
            next.insert(key, KeyValue::new(value, version));
        }
        self.inner.entries.store(Arc::new(next));

        // No receivers simply means nobody is watching yet.
        let _ = self.inner.updates.send(batch);
        version
    }

    fn snapshot_batch(&self, keys: &HashSet<String>) -> Vec<Change> {
        let entries = self.inner.entries.load();
        keys.iter()
            .filter_map(|key| {
                entries
                    .get(key)
                    .map(|kv| Change::new(self.inner.source, key.clone(), kv.value.clone(), kv.version))
            })
            .collect()
    }
}

#[async_trait]
impl Getter for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<KeyValue>> {
        Ok(self.inner.entries.load().get(key).cloned())
    }
}

#[async_trait]
impl Watcher for MemoryStore {
    async fn watch(&self, ctx: WatchContext) -> Result<()> {
        if ctx.source() != self.inner.source {
            return Err(ConfigError::backend(
                ctx.source(),
                format!("memory store serves {}", self.inner.source),
            ));
        }

        let keys: HashSet<String> = ctx.items().iter().map(|item| item.key().to_string()).collect();
        let mut updates = self.inner.updates.subscribe();
        let store = self.clone();

        tokio::spawn(async move {
            // Writes made before the subscription would otherwise be missed.
            if !ctx.send(store.snapshot_batch(&keys)).await {
                tracing::debug!(source = %ctx.source(), "memory watcher stopped");
                return;
            }

            loop {
                let received = tokio::select! {
                    biased;
                    _ = ctx.cancel().cancelled() => break,
                    received = updates.recv() => received,
                };

                let batch = match received {
                    Ok(batch) => batch
                        .into_iter()
                        .filter(|change| keys.contains(change.key()))
                        .collect(),
                    Err(RecvError::Lagged(skipped)) => {
                        ctx.report(ConfigError::backend(
                            ctx.source(),
                            format!("watcher lagged by {skipped} updates, resynchronizing"),
                        ))
                        .await;
                        store.snapshot_batch(&keys)
                    }
                    Err(RecvError::Closed) => break,
                };

                if !ctx.send(batch).await {
                    break;
                }
            }
            tracing::debug!(source = %ctx.source(), "memory watcher stopped");
        });

        Ok(())
    }
}
