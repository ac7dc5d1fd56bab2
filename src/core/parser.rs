//! Structural parser that turns a configuration record into a field registry.
//!
//! Records describe their own shape through [`Record::walk`]. The [`record!`]
//! macro writes that impl for you from `#[source(...)]` annotations; hand-written
//! impls are equally valid.
//!
//! [`record!`]: crate::record

use crate::core::{Field, Source};
use crate::error::{ConfigError, Result};
use crate::sync::Settable;
use std::collections::{BTreeMap, HashMap, HashSet};

/// What a field value looks like to the parser.
pub enum Node<'a> {
    /// A container that satisfies the string-conversion capability.
    Leaf(Box<dyn Settable>),
    /// A nested record to walk into.
    Record(&'a dyn Record),
    /// Any other type; carries its type name for error reporting.
    Unsupported(&'static str),
}

/// Implemented by every type that may appear as a field of a record.
pub trait Reflect {
    /// Describe this value to the parser.
    fn node(&self) -> Node<'_>;
}

/// A configuration record: a struct whose fields can be walked.
///
/// # Examples
///
/// ```rust
/// use fieldwatch::core::{Node, Record, Reflect, Walker};
/// use fieldwatch::sync::SyncInt64;
///
/// struct Limits {
///     max_connections: SyncInt64,
/// }
///
/// impl Record for Limits {
///     fn walk(&self, walker: &mut Walker<'_>) -> fieldwatch::error::Result<()> {
///         walker.field("max_connections", &[("env", "MAX_CONNECTIONS")], &self.max_connections)
///     }
/// }
///
/// impl Reflect for Limits {
///     fn node(&self) -> Node<'_> {
///         Node::Record(self)
///     }
/// }
/// ```
pub trait Record {
    /// Visit every field with [`Walker::field`].
    ///
    /// # Errors
    ///
    /// Propagates the first error reported by the walker.
    fn walk(&self, walker: &mut Walker<'_>) -> Result<()>;
}

/// Accumulates fields while a record is walked.
pub struct Walker<'p> {
    prefix: Vec<&'p str>,
    parsed: &'p mut Parsed,
}

#[derive(Default)]
pub(crate) struct Parsed {
    pub(crate) fields: Vec<Field>,
    names: HashSet<String>,
    keys: HashMap<Source, HashMap<String, String>>,
}

impl Walker<'_> {
    /// Register one field of the record being walked.
    ///
    /// `tags` are `(tag, key)` pairs; tags that do not name a [`Source`] are
    /// ignored. A field with at least one source tag must be a leaf container.
    /// A field without tags is walked into when it is a record and skipped
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error when a tagged field is not a leaf, a source is declared
    /// twice, a name is reused, or a key is already bound on the same source.
    pub fn field(&mut self, name: &str, tags: &[(&str, &str)], value: &dyn Reflect) -> Result<()> {
        let full_name = self.full_name(name);
        let sources = parse_tags(&full_name, tags)?;

        match value.node() {
            Node::Record(record) if sources.is_empty() => {
                let mut prefix = self.prefix.clone();
                prefix.push(name);
                let mut nested = Walker {
                    prefix,
                    parsed: &mut *self.parsed,
                };
                record.walk(&mut nested)
            }
            _ if sources.is_empty() => {
                tracing::trace!(field = %full_name, "skipping field without sources");
                Ok(())
            }
            Node::Leaf(container) => self.register(full_name, sources, container),
            Node::Record(_) => Err(ConfigError::UnsupportedType {
                field: full_name,
                type_name: "record",
            }),
            Node::Unsupported(type_name) => Err(ConfigError::UnsupportedType {
                field: full_name,
                type_name,
            }),
        }
    }

    fn full_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            return name.to_string();
        }
        let mut full = self.prefix.join("_");
        full.push('_');
        full.push_str(name);
        full
    }

    fn register(
        &mut self,
        name: String,
        sources: BTreeMap<Source, String>,
        container: Box<dyn Settable>,
    ) -> Result<()> {
        if !self.parsed.names.insert(name.clone()) {
            return Err(ConfigError::DuplicateField(name));
        }

        // Seed values are literals, not backend keys.
        for (source, key) in sources.iter().filter(|(s, _)| **s != Source::Seed) {
            let seen = self.parsed.keys.entry(*source).or_default();
            if let Some(existing) = seen.get(key) {
                return Err(ConfigError::DuplicateKey {
                    origin: *source,
                    key: key.clone(),
                    field: name,
                    existing: existing.clone(),
                });
            }
            seen.insert(key.clone(), name.clone());
        }

        tracing::debug!(field = %name, type_name = container.type_name(), "registered field");
        self.parsed.fields.push(Field::new(name, sources, container));
        Ok(())
    }
}

fn parse_tags(field: &str, tags: &[(&str, &str)]) -> Result<BTreeMap<Source, String>> {
    let mut sources = BTreeMap::new();
    for (tag, key) in tags {
        let Some(source) = Source::from_tag(tag) else {
            tracing::warn!(field, tag, "ignoring unrecognized source tag");
            continue;
        };
        if sources.insert(source, key.to_string()).is_some() {
            return Err(ConfigError::DuplicateTag {
                field: field.to_string(),
                origin: source,
            });
        }
    }
    Ok(sources)
}

/// Walk `root` and collect its leaf fields in declaration order.
pub(crate) fn parse(root: &dyn Reflect) -> Result<Vec<Field>> {
    let record = match root.node() {
        Node::Record(record) => record,
        Node::Leaf(container) => return Err(ConfigError::NotARecord(container.type_name())),
        Node::Unsupported(type_name) => return Err(ConfigError::NotARecord(type_name)),
    };

    let mut parsed = Parsed::default();
    let mut walker = Walker {
        prefix: Vec::new(),
        parsed: &mut parsed,
    };
    record.walk(&mut walker)?;
    Ok(parsed.fields)
}

macro_rules! unsupported {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn node(&self) -> Node<'_> {
                    Node::Unsupported(std::any::type_name::<$ty>())
                }
            }
        )*
    };
}

unsupported!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, String,
    &str, std::time::Duration, std::path::PathBuf,
);

impl<T> Reflect for Vec<T> {
    fn node(&self) -> Node<'_> {
        Node::Unsupported(std::any::type_name::<Self>())
    }
}

impl<T> Reflect for Option<T> {
    fn node(&self) -> Node<'_> {
        Node::Unsupported(std::any::type_name::<Self>())
    }
}

/// Declare a configuration record.
///
/// Generates the struct together with its [`Record`] and [`Reflect`] impls.
/// Bind sources with `#[source(tag = "key", ...)]` placed after any doc
/// comments; untagged fields of record type are walked into.
///
/// # Examples
///
/// ```rust
/// use fieldwatch::core::Config;
/// use fieldwatch::sync::{Secret, SyncInt64, SyncString};
///
/// fieldwatch::record! {
///     #[derive(Default)]
///     pub struct Database {
///         #[source(seed = "localhost", consul = "app/db/host")]
///         pub host: SyncString,
///         #[source(vault = "app/db/password")]
///         pub password: Secret,
///     }
/// }
///
/// fieldwatch::record! {
///     #[derive(Default)]
///     pub struct AppConfig {
///         /// Display name.
///         #[source(seed = "John Doe")]
///         pub name: SyncString,
///         #[source(env = "ENV_AGE")]
///         pub age: SyncInt64,
///         pub db: Database,
///     }
/// }
///
/// let cfg = AppConfig::default();
/// let config = Config::new(&cfg).unwrap();
/// let names: Vec<_> = config.fields().iter().map(|f| f.name()).collect();
/// assert_eq!(names, ["name", "age", "db_host", "db_password"]);
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:expr])*
                $(#[source($($tag:ident = $key:expr),+ $(,)?)])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::core::Record for $name {
            fn walk(&self, walker: &mut $crate::core::Walker<'_>) -> $crate::error::Result<()> {
                $(
                    walker.field(
                        stringify!($field),
                        &[$($((stringify!($tag), $key)),+)?],
                        &self.$field,
                    )?;
                )*
                Ok(())
            }
        }

        impl $crate::core::Reflect for $name {
            fn node(&self) -> $crate::core::Node<'_> {
                $crate::core::Node::Record(self)
            }
        }
    };
}
