//! Configuration update metrics using OpenTelemetry.

use crate::core::{Observer, Source};
use crate::error::ConfigError;
use crate::sources::Change;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Meter};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Observer recording update outcomes as OpenTelemetry metrics.
///
/// Install it with [`Config::with_observer`](crate::core::Config::with_observer)
/// or [`HarvesterBuilder::with_observer`](crate::core::HarvesterBuilder::with_observer).
///
/// # Examples
///
/// ```rust,no_run
/// use fieldwatch::metrics::ConfigMetrics;
/// use opentelemetry::global;
/// use std::sync::Arc;
///
/// let metrics = Arc::new(ConfigMetrics::new(global::meter("fieldwatch")));
/// let builder = fieldwatch::core::Harvester::builder().with_observer(metrics.clone());
///
/// // Call periodically, e.g. from a ticker task.
/// metrics.update_config_age();
/// ```
#[derive(Clone)]
pub struct ConfigMetrics {
    applied: Counter<u64>,
    stale: Counter<u64>,
    conversion_failures: Counter<u64>,
    unmatched: Counter<u64>,
    watch_errors: Counter<u64>,
    config_age_seconds: Gauge<i64>,
    last_update: Arc<Mutex<Instant>>,
}

impl ConfigMetrics {
    /// Create the instruments on `meter`.
    pub fn new(meter: Meter) -> Self {
        let applied = meter
            .u64_counter("fieldwatch.updates.applied")
            .with_description("Number of values applied to fields")
            .build();

        let stale = meter
            .u64_counter("fieldwatch.updates.stale")
            .with_description("Number of updates dropped for carrying an old version")
            .build();

        let conversion_failures = meter
            .u64_counter("fieldwatch.updates.conversion_failures")
            .with_description("Number of values that could not be converted to the field type")
            .build();

        let unmatched = meter
            .u64_counter("fieldwatch.changes.unmatched")
            .with_description("Number of changes not bound to any field")
            .build();

        let watch_errors = meter
            .u64_counter("fieldwatch.watch.errors")
            .with_description("Number of errors reported by running watchers")
            .build();

        let config_age_seconds = meter
            .i64_gauge("fieldwatch.age")
            .with_description("Time since the last applied update in seconds")
            .with_unit("s")
            .build();

        Self {
            applied,
            stale,
            conversion_failures,
            unmatched,
            watch_errors,
            config_age_seconds,
            last_update: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Record the time elapsed since the last applied update.
    pub fn update_config_age(&self) {
        let age_secs = self.last_update.lock().elapsed().as_secs() as i64;
        self.config_age_seconds.record(age_secs, &[]);
    }

    /// Seconds since the last applied update.
    pub fn age_secs(&self) -> u64 {
        self.last_update.lock().elapsed().as_secs()
    }
}

fn field_attr(field: &str) -> [KeyValue; 1] {
    [KeyValue::new("field", field.to_string())]
}

fn source_attr(source: Source) -> [KeyValue; 1] {
    [KeyValue::new("source", source.tag())]
}

impl Observer for ConfigMetrics {
    fn applied(&self, field: &str, _version: u64) {
        self.applied.add(1, &field_attr(field));
        *self.last_update.lock() = Instant::now();
    }

    fn stale(&self, field: &str, _current: u64, _incoming: u64) {
        self.stale.add(1, &field_attr(field));
    }

    fn conversion_failed(&self, field: &str, _error: &ConfigError) {
        self.conversion_failures.add(1, &field_attr(field));
    }

    fn unmatched(&self, change: &Change) {
        self.unmatched.add(1, &source_attr(change.source()));
    }

    fn watch_error(&self, source: Source, _error: &ConfigError) {
        self.watch_errors.add(1, &source_attr(source));
    }
}
