//! Configuration value sources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a configuration value may come from.
///
/// The lowercase variant name doubles as the field tag that binds a key on
/// that source (`seed`, `env`, `consul`, `vault`, `redis`). Sources are
/// ordered by seeding precedence: later sources overwrite earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Source {
    /// Literal default declared on the field.
    Seed,
    /// Process environment variable.
    Env,
    /// Consul key/value store.
    Consul,
    /// Vault secret engine.
    Vault,
    /// Redis key.
    Redis,
}

impl Source {
    /// Every known source, in seeding order.
    pub const ALL: [Source; 5] = [
        Source::Seed,
        Source::Env,
        Source::Consul,
        Source::Vault,
        Source::Redis,
    ];

    /// Tag name used to bind a key on this source.
    pub fn tag(&self) -> &'static str {
        match self {
            Source::Seed => "seed",
            Source::Env => "env",
            Source::Consul => "consul",
            Source::Vault => "vault",
            Source::Redis => "redis",
        }
    }

    /// Recognize a tag name, returning `None` for unknown tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|source| source.tag() == tag)
    }

    /// Whether values for this source come from an external backend.
    pub fn is_external(&self) -> bool {
        !matches!(self, Source::Seed | Source::Env)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("unknown source '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for source in Source::ALL {
            assert_eq!(Source::from_tag(source.tag()), Some(source));
        }
        assert_eq!(Source::from_tag("json"), None);
    }

    #[test]
    fn test_precedence_order() {
        assert!(Source::Seed < Source::Env);
        assert!(Source::Env < Source::Consul);
    }

    #[test]
    fn test_external() {
        assert!(!Source::Seed.is_external());
        assert!(!Source::Env.is_external());
        assert!(Source::Consul.is_external());
        assert!(Source::Redis.is_external());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("vault".parse::<Source>(), Ok(Source::Vault));
        assert!("etcd".parse::<Source>().is_err());
    }
}
