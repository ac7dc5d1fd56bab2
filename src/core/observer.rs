//! Injectable diagnostics for configuration updates.

use crate::core::Source;
use crate::error::ConfigError;
use crate::sources::Change;

/// Receives diagnostics from the registry, the seeder and the monitor.
///
/// Every method has an empty default, so implementors only override what they
/// care about. Calls happen on the writer path and should return quickly.
pub trait Observer: Send + Sync {
    /// A field accepted a new value.
    fn applied(&self, _field: &str, _version: u64) {}

    /// A field dropped an update whose version was not newer than the stored one.
    fn stale(&self, _field: &str, _current: u64, _incoming: u64) {}

    /// A field rejected a value that could not be converted to its type.
    fn conversion_failed(&self, _field: &str, _error: &ConfigError) {}

    /// A change did not match any registered `(source, key)` binding.
    fn unmatched(&self, _change: &Change) {}

    /// A running watcher reported an error.
    fn watch_error(&self, _source: Source, _error: &ConfigError) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}
