//! Builder wiring a record, its backends and the monitor together.

use crate::core::parser::Reflect;
use crate::core::{Config, NoopObserver, Observer, Source};
use crate::error::Result;
use crate::monitor::{Monitor, MonitorHandle, MonitorOptions};
use crate::seed::Seeder;
use crate::sources::{Getter, Item, Watcher};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Builder for a [`Harvester`].
///
/// Collects the backends of every external source and produces a harvester
/// bound to one configuration record.
///
/// # Examples
///
/// ```rust
/// use fieldwatch::prelude::*;
/// use std::sync::Arc;
///
/// fieldwatch::record! {
///     #[derive(Default)]
///     struct AppConfig {
///         #[source(seed = "8080", consul = "app/port")]
///         port: SyncInt64,
///     }
/// }
///
/// # async fn example() -> fieldwatch::error::Result<()> {
/// let consul = MemoryStore::new(Source::Consul);
/// consul.put("app/port", "9090");
///
/// let cfg = AppConfig::default();
/// let harvester = Harvester::builder()
///     .with_getter(Source::Consul, Arc::new(consul.clone()))
///     .with_watcher(Source::Consul, Arc::new(consul))
///     .build(&cfg)?;
///
/// let cancel = CancellationToken::new();
/// let handle = harvester.harvest(&cancel).await?;
/// assert_eq!(cfg.port.get(), 9090);
///
/// cancel.cancel();
/// if let Some(handle) = handle {
///     handle.stopped().await;
/// }
/// # Ok(())
/// # }
/// ```
pub struct HarvesterBuilder {
    getters: HashMap<Source, Arc<dyn Getter>>,
    watchers: HashMap<Source, Arc<dyn Watcher>>,
    items: Vec<Item>,
    observer: Arc<dyn Observer>,
    options: MonitorOptions,
}

impl HarvesterBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            getters: HashMap::new(),
            watchers: HashMap::new(),
            items: Vec::new(),
            observer: Arc::new(NoopObserver),
            options: MonitorOptions::default(),
        }
    }

    /// Register the getter used to seed fields bound to `source`.
    pub fn with_getter(mut self, source: Source, getter: Arc<dyn Getter>) -> Self {
        self.getters.insert(source, getter);
        self
    }

    /// Register the watcher that follows `source`.
    pub fn with_watcher(mut self, source: Source, watcher: Arc<dyn Watcher>) -> Self {
        self.watchers.insert(source, watcher);
        self
    }

    /// Monitor items in addition to the record's external bindings.
    ///
    /// Useful for `env` bindings, which are not monitored unless a watcher
    /// for them is registered and asked to.
    pub fn with_items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.items.extend(items);
        self
    }

    /// Install an observer on the registry.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Size the monitor's channels.
    pub fn with_monitor_options(mut self, options: MonitorOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse `record` and assemble the harvester.
    ///
    /// No monitor is created when no watcher is registered or there is
    /// nothing to monitor.
    ///
    /// # Errors
    ///
    /// Returns any registry construction error from [`Config::new`].
    pub fn build(self, record: &dyn Reflect) -> Result<Harvester> {
        let config = Arc::new(Config::new(record)?.with_observer(self.observer));

        let mut items = config.items();
        for item in self.items {
            if !items.contains(&item) {
                items.push(item);
            }
        }

        let monitor = if self.watchers.is_empty() || items.is_empty() {
            tracing::debug!(
                watchers = self.watchers.len(),
                items = items.len(),
                "monitoring disabled"
            );
            None
        } else {
            Some(Monitor::new(Arc::clone(&config), items, self.watchers)?.with_options(self.options))
        };

        Ok(Harvester {
            config,
            seeder: Seeder::new(self.getters),
            monitor,
        })
    }
}

impl Default for HarvesterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Seeds a configuration record, then keeps it up to date.
pub struct Harvester {
    config: Arc<Config>,
    seeder: Seeder,
    monitor: Option<Monitor>,
}

impl fmt::Debug for Harvester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harvester")
            .field("config", &self.config)
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}

impl Harvester {
    /// Create a new builder.
    pub fn builder() -> HarvesterBuilder {
        HarvesterBuilder::new()
    }

    /// The field registry.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The monitor, when monitoring is enabled.
    pub fn monitor(&self) -> Option<&Monitor> {
        self.monitor.as_ref()
    }

    /// Seed every field, then start monitoring.
    ///
    /// Returns `None` when monitoring is disabled.
    ///
    /// # Errors
    ///
    /// Returns the first seeding error, or the error that prevented the
    /// monitor from starting.
    pub async fn harvest(&self, cancel: &CancellationToken) -> Result<Option<MonitorHandle>> {
        self.seeder.seed(&self.config).await?;

        match &self.monitor {
            Some(monitor) => monitor.start(cancel).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::sources::MemoryStore;
    use crate::sync::{SyncInt64, SyncString};

    crate::record! {
        #[derive(Default)]
        struct Service {
            #[source(seed = "svc")]
            name: SyncString,
            #[source(seed = "1", redis = "svc/replicas")]
            replicas: SyncInt64,
        }
    }

    #[test]
    fn test_no_watchers_means_no_monitor() {
        let cfg = Service::default();
        let harvester = Harvester::builder().build(&cfg).unwrap();
        assert!(harvester.monitor().is_none());
        assert_eq!(harvester.config().len(), 2);
    }

    #[test]
    fn test_extra_items_are_deduplicated() {
        let cfg = Service::default();
        let store = MemoryStore::new(Source::Redis);
        let harvester = Harvester::builder()
            .with_watcher(Source::Redis, Arc::new(store))
            .with_items([Item::new(Source::Redis, "svc/replicas")])
            .build(&cfg)
            .unwrap();

        let debug = format!("{:?}", harvester.monitor().unwrap());
        assert_eq!(debug.matches("svc/replicas").count(), 1);
    }

    #[tokio::test]
    async fn test_harvest_seeds_before_monitoring() {
        let store = MemoryStore::new(Source::Redis);
        store.put("svc/replicas", "3");

        let cfg = Service::default();
        let harvester = Harvester::builder()
            .with_getter(Source::Redis, Arc::new(store.clone()))
            .with_watcher(Source::Redis, Arc::new(store.clone()))
            .build(&cfg)
            .unwrap();

        let cancel = CancellationToken::new();
        let handle = harvester.harvest(&cancel).await.unwrap().unwrap();
        assert_eq!(cfg.name.get(), "svc");
        assert_eq!(cfg.replicas.get(), 3);

        store.put("svc/replicas", "5");
        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while cfg.replicas.get() != 5 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(harvester.config().field("replicas").unwrap().version(), 2);

        cancel.cancel();
        handle.stopped().await;
    }

    #[tokio::test]
    async fn test_seed_failure_skips_monitor() {
        let store = MemoryStore::new(Source::Redis);
        let cfg = Service::default();
        let harvester = Harvester::builder()
            .with_watcher(Source::Redis, Arc::new(store))
            .build(&cfg)
            .unwrap();

        let err = harvester.harvest(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ConfigError::Seed { .. }));
        assert_eq!(
            harvester.monitor().unwrap().state(),
            crate::monitor::MonitorState::Idle
        );
    }
}
