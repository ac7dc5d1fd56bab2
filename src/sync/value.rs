//! Generic reader/writer-locked container.

use super::{FieldType, Settable};
use crate::core::{Node, Reflect};
use crate::error::ConversionError;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A value shared between the configuration record and the registry.
///
/// Reads take a shared lock and return a copy; writes take an exclusive lock.
/// Cloning a `Synced` yields another handle to the same cell, so the handle
/// kept by the registry and the one embedded in the record always agree.
///
/// # Examples
///
/// ```rust
/// use fieldwatch::sync::SyncInt64;
///
/// let port = SyncInt64::new(8080);
/// let handle = port.clone();
///
/// handle.set_from_str("9090").unwrap();
/// assert_eq!(port.get(), 9090);
/// assert!(port.set_from_str("not a number").is_err());
/// assert_eq!(port.get(), 9090);
/// ```
pub struct Synced<T> {
    inner: Arc<RwLock<T>>,
}

impl<T: Clone> Synced<T> {
    /// Create a container holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Return a copy of the current value.
    pub fn get(&self) -> T {
        self.inner.read().clone()
    }

    /// Replace the current value unconditionally.
    ///
    /// Fields registered in a [`Config`](crate::core::Config) should be written
    /// through [`Config::set`](crate::core::Config::set) so that versioning applies.
    pub fn set(&self, value: T) {
        *self.inner.write() = value;
    }
}

impl<T: FieldType> Synced<T> {
    /// Parse `value` and replace the current value.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] if `value` cannot be parsed; the stored
    /// value is left untouched.
    pub fn set_from_str(&self, value: &str) -> Result<(), ConversionError> {
        let parsed = T::parse_str(value)?;
        self.set(parsed);
        Ok(())
    }
}

impl<T: FieldType> Settable for Synced<T> {
    fn set_from_str(&self, value: &str) -> Result<(), ConversionError> {
        Synced::set_from_str(self, value)
    }

    fn render(&self) -> String {
        self.inner.read().render()
    }

    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }
}

impl<T: FieldType> Reflect for Synced<T> {
    fn node(&self) -> Node<'_> {
        Node::Leaf(Box::new(self.clone()))
    }
}

impl<T> Clone for Synced<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Default> Default for Synced<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: FieldType> fmt::Display for Synced<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.read().render())
    }
}

impl<T: fmt::Debug> fmt::Debug for Synced<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Synced").field(&*self.inner.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{SyncBool, SyncFloat64, SyncString};
    use std::thread;

    #[test]
    fn test_default_is_zero_value() {
        assert_eq!(SyncString::default().get(), "");
        assert_eq!(Synced::<i64>::default().get(), 0);
        assert!(!SyncBool::default().get());
    }

    #[test]
    fn test_set_and_get() {
        let value = SyncFloat64::new(1.5);
        value.set(2.5);
        assert_eq!(value.get(), 2.5);
    }

    #[test]
    fn test_failed_parse_keeps_value() {
        let value = SyncBool::new(true);
        assert!(value.set_from_str("maybe").is_err());
        assert!(value.get());
    }

    #[test]
    fn test_clone_shares_cell() {
        let value = SyncString::new("a".to_string());
        let other = value.clone();
        other.set("b".to_string());
        assert_eq!(value.get(), "b");
    }

    #[test]
    fn test_display_and_settable() {
        let value = Synced::new(42i64);
        assert_eq!(value.to_string(), "42");
        assert_eq!(Settable::render(&value), "42");
        assert_eq!(Settable::type_name(&value), "Int64");
    }

    #[test]
    fn test_node_is_leaf() {
        let value = SyncString::default();
        assert!(matches!(value.node(), Node::Leaf(_)));
    }

    #[test]
    fn test_concurrent_readers_see_whole_values() {
        let value = SyncString::new("a".repeat(64));
        let writer = value.clone();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let reader = value.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let current = reader.get();
                        assert!(current == "a".repeat(64) || current == "b".repeat(64));
                    }
                })
            })
            .collect();

        for i in 0..1000 {
            let next = if i % 2 == 0 { "b" } else { "a" };
            writer.set(next.repeat(64));
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
