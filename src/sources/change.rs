//! Values exchanged between backends and the registry.

use crate::core::Source;
use serde::{Deserialize, Serialize};

/// A string-encoded update for the key `key` on `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    source: Source,
    key: String,
    value: String,
    version: u64,
}

impl Change {
    /// Create a change.
    pub fn new(source: Source, key: impl Into<String>, value: impl Into<String>, version: u64) -> Self {
        Self {
            source,
            key: key.into(),
            value: value.into(),
            version,
        }
    }

    /// Source the change originates from.
    pub fn source(&self) -> Source {
        self.source
    }

    /// Raw backend key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// New value, string-encoded.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Version of the value.
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// A `(source, key)` pair a watcher is asked to follow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Item {
    source: Source,
    key: String,
}

impl Item {
    /// Create an item.
    pub fn new(source: Source, key: impl Into<String>) -> Self {
        Self {
            source,
            key: key.into(),
        }
    }

    /// Source to watch.
    pub fn source(&self) -> Source {
        self.source
    }

    /// Raw backend key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A value read from a backend together with its version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// String-encoded value
    pub value: String,
    /// Backend version (modify index); 0 when the backend has none
    pub version: u64,
}

impl KeyValue {
    /// Create a key/value pair.
    pub fn new(value: impl Into<String>, version: u64) -> Self {
        Self {
            value: value.into(),
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_accessors() {
        let change = Change::new(Source::Consul, "app/port", "8080", 7);
        assert_eq!(change.source(), Source::Consul);
        assert_eq!(change.key(), "app/port");
        assert_eq!(change.value(), "8080");
        assert_eq!(change.version(), 7);
    }

    #[test]
    fn test_item_ordering_groups_by_source() {
        let mut items = vec![
            Item::new(Source::Redis, "b"),
            Item::new(Source::Consul, "z"),
            Item::new(Source::Consul, "a"),
        ];
        items.sort();
        assert_eq!(items[0], Item::new(Source::Consul, "a"));
        assert_eq!(items[2].source(), Source::Redis);
    }
}
