//! # fieldwatch
//!
//! Bind the fields of a configuration record to seed values, environment
//! variables and key/value backends, then keep them updated live.
//!
//! ## Overview
//!
//! `fieldwatch` turns a plain struct of typed containers into a registry of
//! addressable fields:
//! - Each field declares where its value comes from (`seed`, `env`, `consul`,
//!   `vault`, `redis`)
//! - A seeder applies the initial value of every field, once
//! - A monitor applies live changes pushed by watchers, dropping stale versions
//! - Readers call `get` on their own copy of the record at any time
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldwatch::prelude::*;
//! use std::sync::Arc;
//!
//! fieldwatch::record! {
//!     #[derive(Debug, Default)]
//!     pub struct AppConfig {
//!         #[source(seed = "John Doe")]
//!         pub name: SyncString,
//!         #[source(env = "APP_AGE", consul = "app/age")]
//!         pub age: SyncInt64,
//!     }
//! }
//!
//! # async fn example() -> fieldwatch::error::Result<()> {
//! let consul = MemoryStore::new(Source::Consul);
//! consul.put("app/age", "42");
//!
//! let cfg = AppConfig::default();
//! let harvester = Harvester::builder()
//!     .with_getter(Source::Consul, Arc::new(consul.clone()))
//!     .with_watcher(Source::Consul, Arc::new(consul.clone()))
//!     .build(&cfg)?;
//!
//! let cancel = CancellationToken::new();
//! harvester.harvest(&cancel).await?;
//! assert_eq!(cfg.name.get(), "John Doe");
//! assert_eq!(cfg.age.get(), 42);
//!
//! // Later writes to the backend reach `cfg.age` through the monitor.
//! consul.put("app/age", "43");
//! cancel.cancel();
//! # Ok(())
//! # }
//! ```
//!
//! ## Versioning
//!
//! Every field stores the version of its last applied update. Version 0
//! always applies (seeding uses it); any other version must be strictly
//! greater than the stored one or the update is dropped.
//!
//! ## Feature Flags
//!
//! - `metrics`: an OpenTelemetry [`Observer`](core::Observer) counting update
//!   outcomes.

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod monitor;
pub mod seed;
pub mod sources;
pub mod sync;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{Config, Harvester, HarvesterBuilder, Observer, Source};
    pub use crate::error::{ConfigError, Result};
    pub use crate::monitor::{MonitorHandle, MonitorOptions, MonitorState};
    pub use crate::sources::{Getter, Item, KeyValue, MemoryStore, PollingWatcher, Watcher};
    pub use crate::sync::{Secret, SyncBool, SyncFloat64, SyncInt64, SyncString, Synced};
    pub use tokio_util::sync::CancellationToken;
}
