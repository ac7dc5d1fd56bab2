//! Field descriptors and the per-field versioning gate.

use crate::core::Source;
use crate::error::{ConfigError, Result};
use crate::sync::Settable;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of a versioned write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The value was replaced.
    Applied,
    /// The update carried a version at or below the stored one and was dropped.
    Stale {
        /// Version stored on the field when the update arrived
        current: u64,
    },
}

/// One addressable leaf of a configuration record.
pub struct Field {
    name: String,
    type_name: &'static str,
    version: Mutex<u64>,
    sources: BTreeMap<Source, String>,
    value: Box<dyn Settable>,
}

impl Field {
    pub(crate) fn new(
        name: String,
        sources: BTreeMap<Source, String>,
        value: Box<dyn Settable>,
    ) -> Self {
        Self {
            name,
            type_name: value.type_name(),
            version: Mutex::new(0),
            sources,
            value,
        }
    }

    /// Full field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptive type name of the bound container.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Version of the last applied update.
    pub fn version(&self) -> u64 {
        *self.version.lock()
    }

    /// Raw keys bound to each source.
    pub fn sources(&self) -> &BTreeMap<Source, String> {
        &self.sources
    }

    /// Key bound to `source`, if any.
    pub fn source(&self, source: Source) -> Option<&str> {
        self.sources.get(&source).map(String::as_str)
    }

    /// Render the current value (secrets stay redacted).
    pub fn render(&self) -> String {
        self.value.render()
    }

    /// Apply a string-encoded update under the versioning discipline.
    ///
    /// Version 0 always applies. A nonzero version at or below the stored one
    /// is stale. The stored version never decreases.
    pub(crate) fn set(&self, value: &str, version: u64) -> Result<SetOutcome> {
        let mut current = self.version.lock();
        if version != 0 && version <= *current {
            return Ok(SetOutcome::Stale { current: *current });
        }

        self.value
            .set_from_str(value)
            .map_err(|source| ConfigError::Conversion {
                field: self.name.clone(),
                source,
            })?;

        if version > *current {
            *current = version;
        }
        Ok(SetOutcome::Applied)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("version", &self.version())
            .field("sources", &self.sources)
            .field("value", &self.render())
            .finish()
    }
}
