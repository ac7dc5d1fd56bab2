//! Core configuration types: sources, fields, the registry and its parser.

mod builder;
mod config;
mod field;
mod observer;
mod parser;
mod source;

pub use builder::{Harvester, HarvesterBuilder};
pub use config::Config;
pub use field::{Field, SetOutcome};
pub use observer::{NoopObserver, Observer};
pub use parser::{Node, Record, Reflect, Walker};
pub use source::Source;
