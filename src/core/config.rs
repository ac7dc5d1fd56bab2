//! The field registry and its versioned write path.

use crate::core::field::SetOutcome;
use crate::core::parser::{self, Reflect};
use crate::core::{Field, NoopObserver, Observer};
use crate::error::{ConfigError, Result};
use crate::sources::Item;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Registry of every addressable field of a configuration record.
///
/// The set of fields is fixed at construction; only field versions and
/// container values change afterwards. All writes go through [`Config::set`].
///
/// # Examples
///
/// ```rust
/// use fieldwatch::core::Config;
/// use fieldwatch::sync::SyncInt64;
///
/// fieldwatch::record! {
///     #[derive(Default)]
///     struct AppConfig {
///         #[source(env = "ENV_AGE")]
///         age: SyncInt64,
///     }
/// }
///
/// let cfg = AppConfig::default();
/// let config = Config::new(&cfg).unwrap();
///
/// config.set("age", "42", 1).unwrap();
/// config.set("age", "99", 1).unwrap(); // stale, dropped
/// assert_eq!(cfg.age.get(), 42);
/// ```
pub struct Config {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    observer: Arc<dyn Observer>,
}

impl Config {
    /// Parse `record` into a registry.
    ///
    /// # Errors
    ///
    /// Returns an error if `record` is not a record, a tagged field lacks the
    /// string-conversion capability, or two fields share a name or a
    /// per-source key.
    pub fn new(record: &dyn Reflect) -> Result<Self> {
        let fields = parser::parse(record)?;
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name().to_string(), i))
            .collect();

        Ok(Self {
            fields,
            index,
            observer: Arc::new(NoopObserver),
        })
    }

    /// Install an observer notified of every write outcome.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// The installed observer.
    pub fn observer(&self) -> &Arc<dyn Observer> {
        &self.observer
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by its full name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is registered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every binding on an external source, as items to monitor.
    pub fn items(&self) -> Vec<Item> {
        self.fields
            .iter()
            .flat_map(|field| field.sources())
            .filter(|(source, _)| source.is_external())
            .map(|(source, key)| Item::new(*source, key.clone()))
            .collect()
    }

    /// Apply a string-encoded value to the named field.
    ///
    /// Version 0 always applies. A nonzero version at or below the field's
    /// stored version is dropped silently; the observer sees it as stale.
    /// A failed conversion leaves value and version untouched. Retries should
    /// carry a strictly greater version; a same-version retry is not
    /// guaranteed to apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FieldNotFound`] for an unknown name and
    /// [`ConfigError::Conversion`] when the value does not parse.
    pub fn set(&self, name: &str, value: &str, version: u64) -> Result<()> {
        let field = self
            .field(name)
            .ok_or_else(|| ConfigError::FieldNotFound(name.to_string()))?;

        match field.set(value, version) {
            Ok(SetOutcome::Applied) => {
                tracing::debug!(field = name, version, value = %field.render(), "field updated");
                self.observer.applied(name, version);
                Ok(())
            }
            Ok(SetOutcome::Stale { current }) => {
                tracing::debug!(field = name, current, incoming = version, "dropping stale update");
                self.observer.stale(name, current, version);
                Ok(())
            }
            Err(err) => {
                tracing::error!(field = name, version, error = %err, "failed to apply value");
                self.observer.conversion_failed(name, &err);
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").field("fields", &self.fields).finish()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in &self.fields {
            writeln!(
                f,
                "{} ({}) = {} @v{}",
                field.name(),
                field.type_name(),
                field.render(),
                field.version()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Source;
    use crate::sync::{Secret, SyncFloat64, SyncInt64, SyncString};
    use parking_lot::Mutex;

    crate::record! {
        #[derive(Default)]
        struct TestConfig {
            #[source(seed = "John Doe")]
            name: SyncString,
            #[source(env = "TEST_CONFIG_AGE", consul = "app/age")]
            age: SyncInt64,
            #[source(redis = "app/ratio")]
            ratio: SyncFloat64,
            #[source(vault = "app/password")]
            password: Secret,
        }
    }

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    impl Observer for Recording {
        fn applied(&self, field: &str, version: u64) {
            self.events.lock().push(format!("applied {field}@{version}"));
        }

        fn stale(&self, field: &str, current: u64, incoming: u64) {
            self.events.lock().push(format!("stale {field} {current}>={incoming}"));
        }

        fn conversion_failed(&self, field: &str, _error: &ConfigError) {
            self.events.lock().push(format!("failed {field}"));
        }
    }

    #[test]
    fn test_lookup() {
        let cfg = TestConfig::default();
        let config = Config::new(&cfg).unwrap();

        assert_eq!(config.len(), 4);
        assert!(!config.is_empty());
        assert_eq!(config.field("age").unwrap().type_name(), "Int64");
        assert!(config.field("missing").is_none());
    }

    #[test]
    fn test_set_unknown_field() {
        let cfg = TestConfig::default();
        let config = Config::new(&cfg).unwrap();
        let err = config.set("missing", "1", 0).unwrap_err();
        assert!(matches!(err, ConfigError::FieldNotFound(ref name) if name == "missing"));
    }

    #[test]
    fn test_set_versions_and_observer() {
        let cfg = TestConfig::default();
        let recording = Arc::new(Recording::default());
        let config = Config::new(&cfg).unwrap().with_observer(recording.clone());

        config.set("age", "42", 1).unwrap();
        config.set("age", "99", 1).unwrap();
        assert!(config.set("age", "abc", 2).is_err());
        config.set("age", "43", 2).unwrap();

        assert_eq!(cfg.age.get(), 43);
        assert_eq!(config.field("age").unwrap().version(), 2);
        assert_eq!(
            *recording.events.lock(),
            ["applied age@1", "stale age 1>=1", "failed age", "applied age@2"]
        );
    }

    #[test]
    fn test_items_cover_external_sources_only() {
        let cfg = TestConfig::default();
        let config = Config::new(&cfg).unwrap();

        let items = config.items();
        assert_eq!(
            items,
            [
                Item::new(Source::Consul, "app/age"),
                Item::new(Source::Redis, "app/ratio"),
                Item::new(Source::Vault, "app/password"),
            ]
        );
    }

    #[test]
    fn test_display_redacts_secrets() {
        let cfg = TestConfig::default();
        let config = Config::new(&cfg).unwrap();
        config.set("password", "hunter2", 0).unwrap();
        config.set("name", "Jane", 0).unwrap();

        let rendered = config.to_string();
        assert!(rendered.contains("name (String) = Jane @v0"));
        assert!(rendered.contains("password (Secret) = *** @v0"));
        assert!(!rendered.contains("hunter2"));
    }
}
