//! Error types for fieldwatch.

use crate::core::Source;

/// Result type alias for fieldwatch operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while building, seeding or monitoring a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The value handed to the parser does not describe itself as a record.
    #[error("configuration must be a record, got {0}")]
    NotARecord(&'static str),

    /// A field carries source tags but its type cannot be converted from a string.
    #[error("field '{field}' of type {type_name} does not support string conversion")]
    UnsupportedType {
        /// Full field name
        field: String,
        /// Rust type name of the offending value
        type_name: &'static str,
    },

    /// Two fields resolved to the same name.
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),

    /// A field declares the same source more than once.
    #[error("field '{field}' declares source {origin} more than once")]
    DuplicateTag {
        /// Full field name
        field: String,
        /// Source declared twice
        origin: Source,
    },

    /// Two fields bind the same key on the same source.
    #[error("duplicate {origin} key '{key}' on field '{field}' (already bound to '{existing}')")]
    DuplicateKey {
        /// Source the key belongs to
        origin: Source,
        /// Raw backend key
        key: String,
        /// Field that attempted the second binding
        field: String,
        /// Field that owns the first binding
        existing: String,
    },

    /// No field with the given name exists in the registry.
    #[error("field '{0}' not found")]
    FieldNotFound(String),

    /// A string value could not be converted into the field's type.
    #[error("failed to set field '{field}': {source}")]
    Conversion {
        /// Full field name
        field: String,
        /// Underlying conversion failure
        #[source]
        source: ConversionError,
    },

    /// An environment variable exists but could not be read.
    #[error("environment variable '{var}' is not valid unicode")]
    Env {
        /// Variable name
        var: String,
    },

    /// A field declares an external source with no registered getter.
    #[error("no getter registered for source {0}")]
    MissingGetter(Source),

    /// Monitored items reference a source with no registered watcher.
    #[error("no watcher registered for source {0}")]
    MissingWatcher(Source),

    /// Seeding a field failed; the whole seed pass is aborted.
    #[error("failed to seed field '{field}': {source}")]
    Seed {
        /// Full field name
        field: String,
        /// Underlying failure
        #[source]
        source: Box<ConfigError>,
    },

    /// A backend reported a failure.
    #[error("{origin} backend error: {message}")]
    Backend {
        /// Source of the backend
        origin: Source,
        /// Human-readable description
        message: String,
    },

    /// A watcher failed to start.
    #[error("failed to start {origin} watcher: {inner}")]
    WatchStart {
        /// Source whose watcher failed
        origin: Source,
        /// Underlying failure
        inner: Box<ConfigError>,
    },

    /// The monitor was constructed with invalid arguments.
    #[error("invalid monitor: {0}")]
    InvalidMonitor(&'static str),

    /// The monitor was already started once.
    #[error("monitor already started")]
    AlreadyStarted,
}

impl ConfigError {
    /// Create a backend error for the given source.
    pub fn backend(origin: Source, message: impl Into<String>) -> Self {
        Self::Backend {
            origin,
            message: message.into(),
        }
    }

    /// Whether this error was raised while building the registry or its collaborators.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::NotARecord(_)
                | Self::UnsupportedType { .. }
                | Self::DuplicateField(_)
                | Self::DuplicateTag { .. }
                | Self::DuplicateKey { .. }
                | Self::MissingGetter(_)
                | Self::MissingWatcher(_)
                | Self::InvalidMonitor(_)
        )
    }
}

/// Failure to parse a string into a field's value type.
///
/// Carries the target type and the reason only; the raw input is not retained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert value into {type_name}: {reason}")]
pub struct ConversionError {
    type_name: &'static str,
    reason: String,
}

impl ConversionError {
    /// Create a conversion error for the given target type.
    pub fn new(type_name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            type_name,
            reason: reason.into(),
        }
    }

    /// Name of the type the value was converted into.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Why the conversion failed.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}
