//! Typed access to the persisted collections.
//!
//! Each collection is loaded and saved whole. Text that fails to parse
//! is treated as an empty collection: corrupt storage heals itself on the
//! next write instead of failing the operation.

use crate::migrate::{RawItem, RawPost};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use zerospoil_core::error::{ZeroSpoilError, ZeroSpoilResult};
use zerospoil_core::{BoardPost, InventoryItem, Notification, PostId, UserAccount};
use zerospoil_store::keys::{inventory_key, notifications_key, BOARD_KEY, USERS_KEY};
use zerospoil_store::KeyValueStore;

/// Handle over the shared (cross-tab) store.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn KeyValueStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> ZeroSpoilResult<Vec<T>> {
        let Some(text) = self.store.get(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<T>>(&text) {
            Ok(list) => Ok(list),
            Err(e) => {
                tracing::warn!(key, error = %e, "unreadable collection; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn save_list<T: Serialize>(&self, key: &str, list: &[T]) -> ZeroSpoilResult<()> {
        let text = serde_json::to_string(list)
            .map_err(|e| ZeroSpoilError::Internal(format!("Failed to encode {key}: {e}")))?;
        self.store.set(key, &text)
    }

    // -- accounts -----------------------------------------------------------

    pub fn users(&self) -> ZeroSpoilResult<Vec<UserAccount>> {
        self.load_list(USERS_KEY)
    }

    pub fn save_users(&self, users: &[UserAccount]) -> ZeroSpoilResult<()> {
        self.save_list(USERS_KEY, users)
    }

    // -- board --------------------------------------------------------------

    /// All posts, newest first, including exhausted ones.
    ///
    /// Posts stored without an id are given one and the board is written
    /// back, so the id survives the next read.
    pub fn board(&self) -> ZeroSpoilResult<Vec<BoardPost>> {
        let raw = self.load_list::<RawPost>(BOARD_KEY)?;
        let minted = raw.iter().filter(|p| p.lacks_id()).count();
        let board: Vec<BoardPost> = raw.into_iter().map(RawPost::normalize).collect();
        if minted > 0 {
            tracing::info!(minted, "persisting ids assigned to legacy posts");
            self.save_board(&board)?;
        }
        Ok(board)
    }

    pub fn save_board(&self, board: &[BoardPost]) -> ZeroSpoilResult<()> {
        self.save_list(BOARD_KEY, board)
    }

    /// Removes a post by id. Returns whether it was present.
    pub fn close_post(&self, post_id: &PostId) -> ZeroSpoilResult<bool> {
        let mut board = self.board()?;
        let before = board.len();
        board.retain(|p| &p.post_id != post_id);
        if board.len() == before {
            return Ok(false);
        }
        self.save_board(&board)?;
        tracing::info!(post_id = %post_id, "post closed");
        Ok(true)
    }

    // -- inventory ----------------------------------------------------------

    /// Items stored without an id are given one and written back.
    pub fn inventory(&self, username: &str) -> ZeroSpoilResult<Vec<InventoryItem>> {
        let raw = self.load_list::<RawItem>(&inventory_key(username))?;
        let minted = raw.iter().filter(|i| i.lacks_id()).count();
        let items: Vec<InventoryItem> = raw.into_iter().map(RawItem::normalize).collect();
        if minted > 0 {
            tracing::info!(user = username, minted, "persisting ids assigned to legacy items");
            self.save_inventory(username, &items)?;
        }
        Ok(items)
    }

    pub fn save_inventory(&self, username: &str, items: &[InventoryItem]) -> ZeroSpoilResult<()> {
        self.save_list(&inventory_key(username), items)
    }

    // -- notifications ------------------------------------------------------

    /// Newest first.
    pub fn notifications(&self, username: &str) -> ZeroSpoilResult<Vec<Notification>> {
        self.load_list(&notifications_key(username))
    }

    pub fn save_notifications(
        &self,
        username: &str,
        notifications: &[Notification],
    ) -> ZeroSpoilResult<()> {
        self.save_list(&notifications_key(username), notifications)
    }
}
