//! Initial population of every field.

use crate::core::{Config, Field, Source};
use crate::error::{ConfigError, Result};
use crate::sources::Getter;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

/// Applies the initial value of every field, once, before monitoring starts.
///
/// Per field the sources are evaluated in order `seed`, `env`, then each
/// external source; every application uses version 0, so the last source that
/// supplies a value wins.
///
/// # Examples
///
/// ```rust
/// use fieldwatch::core::{Config, Source};
/// use fieldwatch::seed::Seeder;
/// use fieldwatch::sources::MemoryStore;
/// use fieldwatch::sync::SyncInt64;
/// use std::sync::Arc;
///
/// fieldwatch::record! {
///     #[derive(Default)]
///     struct AppConfig {
///         #[source(seed = "10", consul = "app/workers")]
///         workers: SyncInt64,
///     }
/// }
///
/// # async fn example() -> fieldwatch::error::Result<()> {
/// let store = MemoryStore::new(Source::Consul);
/// store.put("app/workers", "32");
///
/// let cfg = AppConfig::default();
/// let config = Config::new(&cfg)?;
/// Seeder::default().with_getter(Source::Consul, Arc::new(store)).seed(&config).await?;
///
/// assert_eq!(cfg.workers.get(), 32);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Seeder {
    getters: HashMap<Source, Arc<dyn Getter>>,
}

impl Seeder {
    /// Create a seeder reading external sources through `getters`.
    pub fn new(getters: HashMap<Source, Arc<dyn Getter>>) -> Self {
        Self { getters }
    }

    /// Register the getter used for `source`.
    pub fn with_getter(mut self, source: Source, getter: Arc<dyn Getter>) -> Self {
        self.getters.insert(source, getter);
        self
    }

    /// Seed every field of `config`.
    ///
    /// # Errors
    ///
    /// Any failure aborts the pass and is returned wrapped in
    /// [`ConfigError::Seed`]: a value that does not convert, an environment
    /// variable that is not unicode, a getter failure, or an external source
    /// without a registered getter.
    pub async fn seed(&self, config: &Config) -> Result<()> {
        for field in config.fields() {
            self.seed_field(config, field)
                .await
                .map_err(|source| ConfigError::Seed {
                    field: field.name().to_string(),
                    source: Box::new(source),
                })?;
        }
        tracing::info!(fields = config.len(), "configuration seeded");
        Ok(())
    }

    async fn seed_field(&self, config: &Config, field: &Field) -> Result<()> {
        let name = field.name();
        let mut seeded = false;

        if let Some(value) = field.source(Source::Seed) {
            config.set(name, value, 0)?;
            seeded = true;
        }

        if let Some(var) = field.source(Source::Env) {
            match env::var(var) {
                Ok(value) => {
                    config.set(name, &value, 0)?;
                    seeded = true;
                }
                Err(env::VarError::NotPresent) => {
                    tracing::warn!(field = name, var, "environment variable not set");
                }
                Err(env::VarError::NotUnicode(_)) => {
                    return Err(ConfigError::Env { var: var.to_string() });
                }
            }
        }

        for (source, key) in field.sources().iter().filter(|(s, _)| s.is_external()) {
            let getter = self
                .getters
                .get(source)
                .ok_or(ConfigError::MissingGetter(*source))?;

            match getter.get(key).await? {
                Some(kv) => {
                    config.set(name, &kv.value, 0)?;
                    seeded = true;
                }
                None => {
                    tracing::warn!(field = name, source = %source, key = key.as_str(), "key not found");
                }
            }
        }

        if !seeded {
            tracing::debug!(field = name, "no source supplied a value, keeping zero value");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(unsafe_code)] // For env var manipulation in tests
mod tests {
    use super::*;
    use crate::sources::{KeyValue, MemoryStore};
    use crate::sync::{SyncBool, SyncInt64, SyncString};
    use async_trait::async_trait;

    crate::record! {
        #[derive(Default)]
        struct Layered {
            #[source(seed = "from-seed", env = "FIELDWATCH_SEED_TEST_LAYERED")]
            seed_env: SyncString,
            #[source(seed = "1", env = "FIELDWATCH_SEED_TEST_UNSET", consul = "app/count")]
            all: SyncInt64,
            #[source(seed = "true")]
            flag: SyncBool,
        }
    }

    #[tokio::test]
    async fn test_precedence_seed_env_external() {
        unsafe {
            env::set_var("FIELDWATCH_SEED_TEST_LAYERED", "from-env");
            env::remove_var("FIELDWATCH_SEED_TEST_UNSET");
        }

        let store = MemoryStore::new(Source::Consul);
        store.put("app/count", "3");
        store.put("app/count", "7");

        let cfg = Layered::default();
        let config = Config::new(&cfg).unwrap();
        Seeder::default()
            .with_getter(Source::Consul, Arc::new(store))
            .seed(&config)
            .await
            .unwrap();

        assert_eq!(cfg.seed_env.get(), "from-env");
        assert_eq!(cfg.all.get(), 7);
        assert!(cfg.flag.get());
        assert!(config.fields().iter().all(|f| f.version() == 0));
    }

    #[test]
    fn test_missing_getter_is_fatal() {
        let cfg = Layered::default();
        let config = Config::new(&cfg).unwrap();

        let err = tokio_test::block_on(Seeder::default().seed(&config)).unwrap_err();
        match err {
            ConfigError::Seed { field, source } => {
                assert_eq!(field, "all");
                assert!(matches!(*source, ConfigError::MissingGetter(Source::Consul)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_absent_key_keeps_earlier_value() {
        let cfg = Layered::default();
        let config = Config::new(&cfg).unwrap();
        Seeder::default()
            .with_getter(Source::Consul, Arc::new(MemoryStore::new(Source::Consul)))
            .seed(&config)
            .await
            .unwrap();

        assert_eq!(cfg.all.get(), 1);
    }

    crate::record! {
        #[derive(Default)]
        struct BadSeed {
            #[source(seed = "not-a-number")]
            count: SyncInt64,
        }
    }

    #[tokio::test]
    async fn test_bad_seed_aborts() {
        let cfg = BadSeed::default();
        let config = Config::new(&cfg).unwrap();
        let err = Seeder::default().seed(&config).await.unwrap_err();
        assert!(matches!(err, ConfigError::Seed { ref field, .. } if field == "count"));
        assert_eq!(config.field("count").unwrap().version(), 0);
    }

    struct Broken;

    #[async_trait]
    impl Getter for Broken {
        async fn get(&self, _key: &str) -> Result<Option<KeyValue>> {
            Err(ConfigError::backend(Source::Consul, "unreachable"))
        }
    }

    #[tokio::test]
    async fn test_getter_failure_aborts() {
        let cfg = Layered::default();
        let config = Config::new(&cfg).unwrap();
        let err = Seeder::default()
            .with_getter(Source::Consul, Arc::new(Broken))
            .seed(&config)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }
}
