//! Directory-backed store: one JSON file per key.
//!
//! Several processes may open the same directory; each acts as a tab.
//! Writes land in a temp file and are renamed over the target, so a
//! reader sees either the old or the new collection, never a torn one.
//! [`FileWatcher`] turns other processes' writes into [`StorageEvent`]s
//! by polling content fingerprints.

use crate::{ChangeSource, KeyValueStore, StorageEvent};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zerospoil_core::error::{ZeroSpoilError, ZeroSpoilResult};

const EXTENSION: &str = ".json";
const HEX_PREFIX: &str = "x-";

/// Default poll period for [`FileWatcher`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

fn io_error(action: &str, path: &Path, e: std::io::Error) -> ZeroSpoilError {
    ZeroSpoilError::Storage(format!("Failed to {action} {}: {e}", path.display()))
}

/// Keys made of `[A-Za-z0-9_.-]` map to `<key>.json`; anything else is
/// hex-encoded so usernames can never escape the directory.
fn file_name_for(key: &str) -> String {
    let plain = !key.is_empty()
        && !key.starts_with('.')
        && !key.starts_with(HEX_PREFIX)
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if plain {
        format!("{key}{EXTENSION}")
    } else {
        format!("{HEX_PREFIX}{}{EXTENSION}", hex::encode(key.as_bytes()))
    }
}

fn key_for(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(EXTENSION)?;
    if stem.starts_with('.') {
        return None;
    }
    match stem.strip_prefix(HEX_PREFIX) {
        Some(encoded) => String::from_utf8(hex::decode(encoded).ok()?).ok(),
        None => Some(stem.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> ZeroSpoilResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| io_error("create", &root, e))?;
        tracing::debug!(root = %root.display(), "file store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Change feed over this directory.
    pub fn watch(&self, poll: Duration) -> ZeroSpoilResult<FileWatcher> {
        FileWatcher::new(&self.root, poll)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(file_name_for(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ZeroSpoilResult<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> ZeroSpoilResult<()> {
        let path = self.path_for(key);
        let tmp = self.root.join(format!(
            ".{}.{}.tmp",
            file_name_for(key),
            std::process::id()
        ));
        std::fs::write(&tmp, value).map_err(|e| io_error("write", &tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| io_error("replace", &path, e))?;
        tracing::trace!(key, bytes = value.len(), "stored");
        Ok(())
    }

    fn remove(&self, key: &str) -> ZeroSpoilResult<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &path, e)),
        }
    }

    fn keys(&self) -> ZeroSpoilResult<Vec<String>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| io_error("list", &self.root, e))?;
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error("list", &self.root, e))?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(key) = entry.file_name().to_str().and_then(key_for) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

// ---------------------------------------------------------------------------
// Polling watcher
// ---------------------------------------------------------------------------

type Fingerprints = HashMap<String, [u8; 32]>;

/// Polls a store directory and reports keys whose content changed,
/// appeared, or disappeared since the previous scan.
pub struct FileWatcher {
    store: FileStore,
    poll: Duration,
    interval: Option<tokio::time::Interval>,
    seen: Fingerprints,
    pending: VecDeque<StorageEvent>,
}

impl FileWatcher {
    /// Takes the baseline snapshot immediately; only later writes are reported.
    pub fn new(root: &Path, poll: Duration) -> ZeroSpoilResult<Self> {
        let store = FileStore::open(root)?;
        let seen = scan(&store)?;
        Ok(Self {
            store,
            poll,
            interval: None,
            seen,
            pending: VecDeque::new(),
        })
    }

    /// Rescans now and queues events for every difference.
    fn rescan(&mut self) {
        let current = match scan(&self.store) {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(error = %e, "store scan failed");
                return;
            }
        };

        let mut changed: Vec<&String> = current
            .iter()
            .filter(|(key, digest)| self.seen.get(*key) != Some(*digest))
            .map(|(key, _)| key)
            .chain(self.seen.keys().filter(|key| !current.contains_key(*key)))
            .collect();
        changed.sort();

        for key in changed {
            tracing::debug!(key = %key, "external change detected");
            self.pending.push_back(StorageEvent::key(key.clone()));
        }
        self.seen = current;
    }
}

fn scan(store: &FileStore) -> ZeroSpoilResult<Fingerprints> {
    let mut prints = HashMap::new();
    for key in store.keys()? {
        // Racing with a remove is not an error; the next scan reports it.
        if let Some(text) = store.get(&key)? {
            prints.insert(key, Sha256::digest(text.as_bytes()).into());
        }
    }
    Ok(prints)
}

#[async_trait]
impl ChangeSource for FileWatcher {
    async fn next_change(&mut self) -> Option<StorageEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            let poll = self.poll;
            let interval = self.interval.get_or_insert_with(|| {
                let mut interval = tokio::time::interval(poll);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                interval
            });
            interval.tick().await;
            self.rescan();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_encoded_names() {
        assert_eq!(file_name_for("zs_board"), "zs_board.json");
        let odd = file_name_for("zerospoil_../evil");
        assert!(odd.starts_with("x-"));
        assert_eq!(key_for(&odd).as_deref(), Some("zerospoil_../evil"));
        assert_eq!(key_for("zs_users.json").as_deref(), Some("zs_users"));
        assert_eq!(key_for(".zs_users.json.42.tmp"), None);
    }

    #[test]
    fn round_trips_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("zs_board", "[1]").unwrap();
        store.set("zerospoil_Ana María", "[]").unwrap();
        assert_eq!(store.get("zs_board").unwrap().as_deref(), Some("[1]"));
        assert_eq!(
            store.keys().unwrap(),
            vec!["zerospoil_Ana María".to_string(), "zs_board".to_string()]
        );
        store.remove("zs_board").unwrap();
        store.remove("zs_board").unwrap();
        assert_eq!(store.get("zs_board").unwrap(), None);
    }

    #[tokio::test]
    async fn watcher_reports_external_writes() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileStore::open(dir.path()).unwrap();
        writer.set("zs_users", "[]").unwrap();

        let mut watcher = FileWatcher::new(dir.path(), Duration::from_millis(10)).unwrap();
        writer.set("zs_board", "[]").unwrap();
        assert_eq!(
            watcher.next_change().await,
            Some(StorageEvent::key("zs_board"))
        );

        writer.remove("zs_users").unwrap();
        assert_eq!(
            watcher.next_change().await,
            Some(StorageEvent::key("zs_users"))
        );
    }
}
