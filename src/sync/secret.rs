//! Redacting container variant.

use super::{FieldType, Settable, Synced};
use crate::core::{Node, Reflect};
use crate::error::ConversionError;
use std::fmt;

/// Marker rendered in place of a secret value.
pub const REDACTED: &str = "***";

/// A container whose rendered form never reveals its value.
///
/// `get`, `set` and `set_from_str` behave like [`Synced`]; `Display`, `Debug`
/// and [`Settable::render`] always produce [`REDACTED`], whatever the value.
/// A secret whose value is literally `***` is therefore indistinguishable
/// from its rendered form.
///
/// # Examples
///
/// ```rust
/// use fieldwatch::sync::Secret;
///
/// let token: Secret = Secret::new("hunter2".to_string());
/// assert_eq!(token.get(), "hunter2");
/// assert_eq!(token.to_string(), "***");
/// ```
pub struct Secret<T = String>(Synced<T>);

impl<T: Clone> Secret<T> {
    /// Create a secret holding `value`.
    pub fn new(value: T) -> Self {
        Self(Synced::new(value))
    }

    /// Return a copy of the true value.
    pub fn get(&self) -> T {
        self.0.get()
    }

    /// Replace the value unconditionally.
    pub fn set(&self, value: T) {
        self.0.set(value);
    }
}

impl<T: FieldType> Secret<T> {
    /// Parse `value` and replace the current value.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] if `value` cannot be parsed.
    pub fn set_from_str(&self, value: &str) -> Result<(), ConversionError> {
        self.0.set_from_str(value)
    }
}

impl<T: FieldType> Settable for Secret<T> {
    fn set_from_str(&self, value: &str) -> Result<(), ConversionError> {
        self.0.set_from_str(value)
    }

    fn render(&self) -> String {
        REDACTED.to_string()
    }

    fn type_name(&self) -> &'static str {
        "Secret"
    }
}

impl<T: FieldType> Reflect for Secret<T> {
    fn node(&self) -> Node<'_> {
        Node::Leaf(Box::new(self.clone()))
    }
}

impl<T> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone + Default> Default for Secret<T> {
    fn default() -> Self {
        Self(Synced::default())
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&REDACTED).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_secret_redacts_everywhere() {
        let secret = Secret::new("s3cr3t".to_string());
        assert_eq!(secret.to_string(), REDACTED);
        assert_eq!(format!("{:?}", secret), "Secret(\"***\")");
        assert_eq!(Settable::render(&secret), REDACTED);
        assert_eq!(secret.get(), "s3cr3t");
    }

    #[test]
    fn test_secret_of_number() {
        let secret: Secret<i64> = Secret::default();
        secret.set_from_str("1234").unwrap();
        assert_eq!(secret.get(), 1234);
        assert!(secret.set_from_str("x").is_err());
        assert_eq!(secret.get(), 1234);
    }

    #[test]
    fn test_secret_equal_to_marker() {
        let secret = Secret::new(REDACTED.to_string());
        assert_eq!(Settable::render(&secret), REDACTED);
        assert_eq!(secret.get(), REDACTED);
    }

    proptest! {
        #[test]
        fn prop_render_is_constant(value in any::<String>()) {
            let secret = Secret::new(String::new());
            secret.set_from_str(&value).unwrap();
            prop_assert_eq!(Settable::render(&secret), REDACTED);
            prop_assert_eq!(secret.to_string(), REDACTED);
            prop_assert_eq!(format!("{:?}", secret), "Secret(\"***\")");
            prop_assert_eq!(secret.get(), value);
        }

        #[test]
        fn prop_render_never_reveals_value(value in any::<String>()) {
            prop_assume!(value != REDACTED);
            let secret = Secret::new(value.clone());
            prop_assert_ne!(Settable::render(&secret), value.clone());
            prop_assert_ne!(secret.to_string(), value.clone());
        }
    }
}
