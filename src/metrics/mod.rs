//! Built-in metrics for configuration updates.
//!
//! Provides an OpenTelemetry-backed [`Observer`](crate::core::Observer)
//! tracking:
//! - Applied, stale and rejected updates per field
//! - Unmatched changes and watcher errors per source
//! - Time since the last applied update
//!
//! # Examples
//!
//! ```rust,no_run
//! use fieldwatch::prelude::*;
//! use fieldwatch::metrics::ConfigMetrics;
//! use opentelemetry::global;
//! use std::sync::Arc;
//!
//! fieldwatch::record! {
//!     #[derive(Default)]
//!     struct AppConfig {
//!         #[source(consul = "app/port")]
//!         port: SyncInt64,
//!     }
//! }
//!
//! # fn example() -> fieldwatch::error::Result<()> {
//! let cfg = AppConfig::default();
//! let harvester = Harvester::builder()
//!     .with_observer(Arc::new(ConfigMetrics::new(global::meter("my-app"))))
//!     .build(&cfg)?;
//! # Ok(())
//! # }
//! ```

mod config_metrics;

pub use config_metrics::ConfigMetrics;
