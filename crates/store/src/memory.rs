//! In-process store shared by every "tab" holding an `Arc<MemoryStore>`.
//!
//! Writes that change a value are broadcast to all subscribers, the same
//! way a browser fires `storage` events at other tabs.

use crate::{ChangeSource, KeyValueStore, StorageEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use zerospoil_core::error::{ZeroSpoilError, ZeroSpoilResult};

/// Buffered events per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

fn poisoned<T>(_err: PoisonError<T>) -> ZeroSpoilError {
    ZeroSpoilError::Storage("memory store lock poisoned".into())
}

pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    changes: broadcast::Sender<StorageEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Receives an event for every subsequent write that changes a value.
    pub fn subscribe(&self) -> MemoryChanges {
        MemoryChanges {
            rx: self.changes.subscribe(),
        }
    }

    fn notify(&self, key: &str) {
        // No subscribers is fine.
        let _ = self.changes.send(StorageEvent::key(key));
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ZeroSpoilResult<Option<String>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ZeroSpoilResult<()> {
        let changed = {
            let mut entries = self.entries.write().map_err(poisoned)?;
            entries.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        };
        if changed {
            self.notify(key);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> ZeroSpoilResult<()> {
        let removed = self.entries.write().map_err(poisoned)?.remove(key).is_some();
        if removed {
            self.notify(key);
        }
        Ok(())
    }

    fn keys(&self) -> ZeroSpoilResult<Vec<String>> {
        let entries = self.entries.read().map_err(poisoned)?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Subscription handle returned by [`MemoryStore::subscribe`].
pub struct MemoryChanges {
    rx: broadcast::Receiver<StorageEvent>,
}

#[async_trait]
impl ChangeSource for MemoryChanges {
    async fn next_change(&mut self) -> Option<StorageEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "change feed lagged; forcing full reload");
                Some(StorageEvent::resync())
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[tokio::test]
    async fn writes_are_broadcast() {
        let store = MemoryStore::new();
        let mut changes = store.subscribe();
        store.set("zs_board", "[]").unwrap();
        assert_eq!(
            changes.next_change().await,
            Some(StorageEvent::key("zs_board"))
        );
    }

    #[tokio::test]
    async fn unchanged_value_is_silent() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        let mut changes = store.subscribe();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(changes.next_change().await, Some(StorageEvent::key("b")));
    }
}
