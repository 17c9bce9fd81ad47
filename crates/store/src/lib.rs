//! Persistent key/value storage for ZeroSpoil.
//!
//! Every collection is stored whole, as JSON text, under a string key
//! (see [`keys`]). Writers never coordinate: the last write to a key
//! wins. Other readers learn about writes through a [`ChangeSource`].

pub mod file;
pub mod keys;
pub mod memory;

use async_trait::async_trait;
use std::sync::Arc;
use zerospoil_core::error::ZeroSpoilResult;

pub use file::{FileStore, FileWatcher};
pub use memory::{MemoryChanges, MemoryStore};

/// Synchronous string key/value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ZeroSpoilResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ZeroSpoilResult<()>;
    fn remove(&self, key: &str) -> ZeroSpoilResult<()>;
    fn keys(&self) -> ZeroSpoilResult<Vec<String>>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> ZeroSpoilResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> ZeroSpoilResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> ZeroSpoilResult<()> {
        (**self).remove(key)
    }

    fn keys(&self) -> ZeroSpoilResult<Vec<String>> {
        (**self).keys()
    }
}

/// A key changed in the shared store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// `None` when the source cannot say which key changed (missed
    /// events); listeners should then reload everything.
    pub key: Option<String>,
}

impl StorageEvent {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }

    pub fn resync() -> Self {
        Self { key: None }
    }

    /// True if this event may affect `key`.
    pub fn touches(&self, key: &str) -> bool {
        self.key.as_deref().map_or(true, |k| k == key)
    }
}

/// Abstraction over "another tab wrote to storage" notifications.
#[async_trait]
pub trait ChangeSource: Send {
    /// Waits for the next change. `None` once the source is closed.
    async fn next_change(&mut self) -> Option<StorageEvent>;
}
