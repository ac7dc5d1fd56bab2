//! Backend interfaces and built-in backends.
//!
//! Concrete network clients (Consul, Vault, Redis) live outside this crate and
//! plug in through [`Getter`] and [`Watcher`].

mod change;
mod memory;
mod poll;
mod watcher;

pub use change::{Change, Item, KeyValue};
pub use memory::{DEFAULT_UPDATE_CAPACITY, MemoryStore};
pub use poll::{DEFAULT_POLL_INTERVAL, PollingWatcher};
pub use watcher::{Getter, WatchContext, Watcher};
