//! Thread-safe typed value containers.
//!
//! Every leaf of a configuration record is stored in a container that can be
//! read by many tasks while a single writer (the seeder, then the monitor)
//! replaces its value from a string.

mod secret;
mod value;

pub use secret::{REDACTED, Secret};
pub use value::Synced;

use crate::error::ConversionError;

/// Boolean container.
pub type SyncBool = Synced<bool>;
/// 64-bit signed integer container.
pub type SyncInt64 = Synced<i64>;
/// 64-bit float container.
pub type SyncFloat64 = Synced<f64>;
/// String container.
pub type SyncString = Synced<String>;

/// A value type that can be stored in a [`Synced`] container.
///
/// Implement this for your own types to bind them to configuration sources.
///
/// # Examples
///
/// ```rust
/// use fieldwatch::error::ConversionError;
/// use fieldwatch::sync::{FieldType, Synced};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Default)]
/// enum Level {
///     #[default]
///     Info,
///     Debug,
/// }
///
/// impl FieldType for Level {
///     const TYPE_NAME: &'static str = "Level";
///
///     fn parse_str(value: &str) -> Result<Self, ConversionError> {
///         match value {
///             "info" => Ok(Level::Info),
///             "debug" => Ok(Level::Debug),
///             other => Err(ConversionError::new(Self::TYPE_NAME, format!("unknown level '{other}'"))),
///         }
///     }
///
///     fn render(&self) -> String {
///         match self {
///             Level::Info => "info".into(),
///             Level::Debug => "debug".into(),
///         }
///     }
/// }
///
/// let level = Synced::new(Level::Info);
/// level.set_from_str("debug").unwrap();
/// assert_eq!(level.get(), Level::Debug);
/// ```
pub trait FieldType: Clone + Send + Sync + 'static {
    /// Descriptive name reported by the registry (e.g. `"Int64"`).
    const TYPE_NAME: &'static str;

    /// Parse a textual representation into a value.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] describing why the input is malformed.
    fn parse_str(value: &str) -> Result<Self, ConversionError>;

    /// Render the value as a string.
    fn render(&self) -> String;
}

impl FieldType for bool {
    const TYPE_NAME: &'static str = "Bool";

    fn parse_str(value: &str) -> Result<Self, ConversionError> {
        value
            .parse()
            .map_err(|e: std::str::ParseBoolError| ConversionError::new(Self::TYPE_NAME, e.to_string()))
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl FieldType for i64 {
    const TYPE_NAME: &'static str = "Int64";

    fn parse_str(value: &str) -> Result<Self, ConversionError> {
        value
            .parse()
            .map_err(|e: std::num::ParseIntError| ConversionError::new(Self::TYPE_NAME, e.to_string()))
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl FieldType for f64 {
    const TYPE_NAME: &'static str = "Float64";

    fn parse_str(value: &str) -> Result<Self, ConversionError> {
        value
            .parse()
            .map_err(|e: std::num::ParseFloatError| ConversionError::new(Self::TYPE_NAME, e.to_string()))
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl FieldType for String {
    const TYPE_NAME: &'static str = "String";

    fn parse_str(value: &str) -> Result<Self, ConversionError> {
        Ok(value.to_string())
    }

    fn render(&self) -> String {
        self.clone()
    }
}

/// Type-erased capability every registered leaf must provide.
///
/// The registry only ever talks to containers through this trait.
pub trait Settable: Send + Sync {
    /// Parse `value` and replace the stored value.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] and leaves the stored value untouched when
    /// `value` is malformed.
    fn set_from_str(&self, value: &str) -> Result<(), ConversionError>;

    /// Render the current value for display or logging.
    fn render(&self) -> String;

    /// Descriptive type name.
    fn type_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_accepts_canonical_forms_only() {
        assert_eq!(bool::parse_str("true"), Ok(true));
        assert_eq!(bool::parse_str("false"), Ok(false));
        assert!(bool::parse_str("yes").is_err());
        assert!(bool::parse_str("TRUE").is_err());
    }

    #[test]
    fn test_int_is_base_ten() {
        assert_eq!(i64::parse_str("42"), Ok(42));
        assert_eq!(i64::parse_str("-7"), Ok(-7));
        assert!(i64::parse_str("0x10").is_err());
        assert!(i64::parse_str("4.2").is_err());
    }

    #[test]
    fn test_float_grammar() {
        assert_eq!(f64::parse_str("3.5"), Ok(3.5));
        assert_eq!(f64::parse_str("1e3"), Ok(1000.0));
        assert!(f64::parse_str("three").is_err());
    }

    #[test]
    fn test_string_passthrough() {
        assert_eq!(String::parse_str(" spaced "), Ok(" spaced ".to_string()));
        assert_eq!(String::parse_str(""), Ok(String::new()));
    }

    #[test]
    fn test_conversion_error_names_type() {
        let err = i64::parse_str("abc").unwrap_err();
        assert_eq!(err.type_name(), "Int64");
    }
}
