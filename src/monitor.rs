//! Live application of watcher changes to the registry.

use crate::core::{Config, Source};
use crate::error::{ConfigError, Result};
use crate::sources::{Change, Item, WatchContext, Watcher};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// `(source, key)` to field name.
type Index = HashMap<Source, HashMap<String, String>>;

/// Lifecycle of a [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    /// Constructed, or still starting its watchers.
    Idle,
    /// Watchers started, loop consuming changes.
    Running,
    /// Loop exited or start failed. Terminal.
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Sizing of the channels watchers feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorOptions {
    /// Capacity of the change batch channel.
    pub change_buffer: usize,
    /// Capacity of the watcher error channel.
    pub error_buffer: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            change_buffer: 64,
            error_buffer: 16,
        }
    }
}

/// Consumes change batches from every watcher and applies them through
/// [`Config::set`].
///
/// A monitor runs once: after it stops it cannot be restarted.
///
/// # Examples
///
/// ```rust
/// use fieldwatch::core::{Config, Source};
/// use fieldwatch::monitor::Monitor;
/// use fieldwatch::sources::{MemoryStore, Watcher};
/// use fieldwatch::sync::SyncString;
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// fieldwatch::record! {
///     #[derive(Default)]
///     struct AppConfig {
///         #[source(consul = "app/mode")]
///         mode: SyncString,
///     }
/// }
///
/// # async fn example() -> fieldwatch::error::Result<()> {
/// let store = MemoryStore::new(Source::Consul);
/// let cfg = AppConfig::default();
/// let config = Arc::new(Config::new(&cfg)?);
///
/// let mut watchers: HashMap<Source, Arc<dyn Watcher>> = HashMap::new();
/// watchers.insert(Source::Consul, Arc::new(store.clone()));
///
/// let monitor = Monitor::new(Arc::clone(&config), config.items(), watchers)?;
/// let handle = monitor.start(&CancellationToken::new()).await?;
///
/// store.put("app/mode", "maintenance");
/// // ... cfg.mode eventually reads "maintenance"
///
/// handle.stop();
/// handle.stopped().await;
/// # Ok(())
/// # }
/// ```
pub struct Monitor {
    config: Arc<Config>,
    items: Vec<Item>,
    watchers: HashMap<Source, Arc<dyn Watcher>>,
    index: Arc<Index>,
    options: MonitorOptions,
    state: Arc<Mutex<MonitorState>>,
    started: AtomicBool,
}

impl Monitor {
    /// Create an idle monitor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMonitor`] when `items` or `watchers` is
    /// empty.
    pub fn new(
        config: Arc<Config>,
        items: Vec<Item>,
        watchers: HashMap<Source, Arc<dyn Watcher>>,
    ) -> Result<Self> {
        if items.is_empty() {
            return Err(ConfigError::InvalidMonitor("no items to monitor"));
        }
        if watchers.is_empty() {
            return Err(ConfigError::InvalidMonitor("no watchers registered"));
        }

        let mut index = Index::new();
        for field in config.fields() {
            for (source, key) in field.sources().iter().filter(|(s, _)| **s != Source::Seed) {
                index
                    .entry(*source)
                    .or_default()
                    .insert(key.clone(), field.name().to_string());
            }
        }

        for item in &items {
            let bound = index
                .get(&item.source())
                .is_some_and(|keys| keys.contains_key(item.key()));
            if !bound {
                tracing::warn!(source = %item.source(), key = item.key(), "monitored item is not bound to any field");
            }
        }

        Ok(Self {
            config,
            items,
            watchers,
            index: Arc::new(index),
            options: MonitorOptions::default(),
            state: Arc::new(Mutex::new(MonitorState::Idle)),
            started: AtomicBool::new(false),
        })
    }

    /// Override channel sizing.
    pub fn with_options(mut self, options: MonitorOptions) -> Self {
        self.options = options;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MonitorState {
        *self.state.lock()
    }

    /// Start one watcher per source with items and spawn the consuming loop.
    ///
    /// The loop stops when `cancel` (or the returned handle) is cancelled.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::AlreadyStarted`] on a second call.
    /// - [`ConfigError::MissingWatcher`] when a source has items but no watcher.
    /// - [`ConfigError::WatchStart`] when a watcher fails to start.
    ///
    /// On the last two, watchers already started are cancelled and the
    /// monitor ends up [`MonitorState::Stopped`].
    pub async fn start(&self, cancel: &CancellationToken) -> Result<MonitorHandle> {
        // Stays `Idle` while watchers start; `Running` once all of them have.
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ConfigError::AlreadyStarted);
        }

        let stop = cancel.child_token();
        let watch_cancel = stop.child_token();
        let (changes_tx, changes_rx) = mpsc::channel(self.options.change_buffer.max(1));
        let (errors_tx, errors_rx) = mpsc::channel(self.options.error_buffer.max(1));

        let mut grouped: BTreeMap<Source, Vec<Item>> = BTreeMap::new();
        for item in &self.items {
            grouped.entry(item.source()).or_default().push(item.clone());
        }

        for (source, items) in grouped {
            let count = items.len();
            let started = match self.watchers.get(&source) {
                Some(watcher) => {
                    let ctx = WatchContext::new(
                        source,
                        items,
                        watch_cancel.clone(),
                        changes_tx.clone(),
                        errors_tx.clone(),
                    );
                    watcher.watch(ctx).await.map_err(|err| ConfigError::WatchStart {
                        origin: source,
                        inner: Box::new(err),
                    })
                }
                None => Err(ConfigError::MissingWatcher(source)),
            };

            if let Err(err) = started {
                tracing::error!(source = %source, error = %err, "monitor failed to start");
                watch_cancel.cancel();
                *self.state.lock() = MonitorState::Stopped;
                return Err(err);
            }
            tracing::debug!(source = %source, items = count, "watcher started");
        }

        *self.state.lock() = MonitorState::Running;
        tracing::info!(items = self.items.len(), "monitor started");

        let task = tokio::spawn(run(
            Arc::clone(&self.config),
            Arc::clone(&self.index),
            Arc::clone(&self.state),
            stop.clone(),
            watch_cancel,
            changes_rx,
            errors_rx,
        ));

        Ok(MonitorHandle {
            state: Arc::clone(&self.state),
            stop,
            task,
        })
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("items", &self.items)
            .field("sources", &self.watchers.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .field("state", &self.state())
            .finish()
    }
}

async fn run(
    config: Arc<Config>,
    index: Arc<Index>,
    state: Arc<Mutex<MonitorState>>,
    stop: CancellationToken,
    watch_cancel: CancellationToken,
    mut changes: mpsc::Receiver<Vec<Change>>,
    mut errors: mpsc::Receiver<(Source, ConfigError)>,
) {
    let mut changes_open = true;
    let mut errors_open = true;

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            batch = changes.recv(), if changes_open => match batch {
                Some(batch) => apply(&config, &index, batch),
                None => {
                    tracing::debug!("all watchers closed their change channel");
                    changes_open = false;
                }
            },
            reported = errors.recv(), if errors_open => match reported {
                Some((source, err)) => {
                    tracing::error!(source = %source, error = %err, "watcher error");
                    config.observer().watch_error(source, &err);
                }
                None => errors_open = false,
            },
        }
    }

    watch_cancel.cancel();
    *state.lock() = MonitorState::Stopped;
    tracing::info!("monitor stopped");
}

fn apply(config: &Config, index: &Index, batch: Vec<Change>) {
    for change in batch {
        let Some(field) = index
            .get(&change.source())
            .and_then(|keys| keys.get(change.key()))
        else {
            tracing::warn!(source = %change.source(), key = change.key(), "change does not match any field");
            config.observer().unmatched(&change);
            continue;
        };

        // Failures are logged and observed by `Config::set`.
        let _ = config.set(field, change.value(), change.version());
    }
}

/// Control over a started [`Monitor`].
///
/// Dropping the handle does not stop the monitor.
pub struct MonitorHandle {
    state: Arc<Mutex<MonitorState>>,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> MonitorState {
        *self.state.lock()
    }

    /// Request the loop and every watcher to stop. Idempotent.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Wait for the loop to exit.
    pub async fn stopped(self) {
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "monitor task failed");
        }
    }
}

impl fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("state", &self.state())
            .finish()
    }
}
