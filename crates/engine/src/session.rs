//! The logged-in user's inventory, held explicitly between operations.
//!
//! An [`InventorySession`] is a cached copy of one user's inventory.
//! Owner edits mutate the cache and write the whole collection back.
//! Writes made elsewhere (claims settled by other users, other tabs) are
//! only seen after [`InventorySession::reload`].

use crate::ledger::Ledger;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use zerospoil_core::error::{ZeroSpoilError, ZeroSpoilResult};
use zerospoil_core::{BoardPost, InventoryItem, ItemDraft, ItemId};

#[derive(Debug, Clone)]
pub struct InventorySession {
    username: String,
    items: Vec<InventoryItem>,
}

impl InventorySession {
    /// Loads `username`'s inventory and repairs stale posted flags.
    pub fn load(ledger: &Ledger, username: &str) -> ZeroSpoilResult<Self> {
        let mut session = Self {
            username: username.to_string(),
            items: Vec::new(),
        };
        session.reload(ledger)?;
        Ok(session)
    }

    /// Replaces the cache with what is currently persisted.
    pub fn reload(&mut self, ledger: &Ledger) -> ZeroSpoilResult<()> {
        let mut items = ledger.inventory(&self.username)?;
        let board = ledger.board()?;
        repair_orphaned_flags(&self.username, &mut items, &board);
        self.items = items;
        Ok(())
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn find(&self, id: &ItemId) -> Option<&InventoryItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    pub(crate) fn find_mut(&mut self, id: &ItemId) -> ZeroSpoilResult<&mut InventoryItem> {
        self.items
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| ZeroSpoilError::ItemNotFound(id.to_string()))
    }

    pub fn save(&self, ledger: &Ledger) -> ZeroSpoilResult<()> {
        ledger.save_inventory(&self.username, &self.items)
    }

    pub fn add_item(
        &mut self,
        ledger: &Ledger,
        draft: ItemDraft,
        now: DateTime<Utc>,
    ) -> ZeroSpoilResult<ItemId> {
        let item = InventoryItem::from_draft(draft, now)?;
        let id = item.id.clone();
        tracing::info!(user = %self.username, item_id = %id, product = %item.product, "item added");
        self.items.push(item);
        self.save(ledger)?;
        Ok(id)
    }

    /// Posted items are locked until their post closes.
    pub fn edit_item(&mut self, ledger: &Ledger, id: &ItemId, draft: ItemDraft) -> ZeroSpoilResult<()> {
        let item = self.find_mut(id)?;
        if item.posted_for_redistribution {
            return Err(ZeroSpoilError::ItemLocked);
        }
        item.apply_draft(draft)?;
        tracing::info!(user = %self.username, item_id = %id, "item edited");
        self.save(ledger)
    }

    pub fn remove_item(&mut self, ledger: &Ledger, id: &ItemId) -> ZeroSpoilResult<InventoryItem> {
        let idx = self
            .items
            .iter()
            .position(|i| &i.id == id)
            .ok_or_else(|| ZeroSpoilError::ItemNotFound(id.to_string()))?;
        if self.items[idx].posted_for_redistribution {
            return Err(ZeroSpoilError::ItemLocked);
        }
        let removed = self.items.remove(idx);
        tracing::info!(user = %self.username, item_id = %id, "item removed");
        self.save(ledger)?;
        Ok(removed)
    }

    /// Drops every item that is not on the board. Returns how many went.
    pub fn clear_unposted(&mut self, ledger: &Ledger) -> ZeroSpoilResult<usize> {
        if self.items.is_empty() {
            return Err(ZeroSpoilError::NothingToClear);
        }
        let before = self.items.len();
        self.items.retain(|i| i.posted_for_redistribution);
        let removed = before - self.items.len();
        if removed == 0 {
            return Err(ZeroSpoilError::ItemLocked);
        }
        tracing::info!(user = %self.username, removed, kept = self.items.len(), "inventory cleared");
        self.save(ledger)?;
        Ok(removed)
    }
}

/// An item flagged as posted must have an open post on the board. When
/// the post has vanished (lost update, closed by another path) the flag
/// is dropped so the item can be edited or posted again.
fn repair_orphaned_flags(username: &str, items: &mut [InventoryItem], board: &[BoardPost]) {
    let offered: HashSet<&ItemId> = board
        .iter()
        .filter(|p| p.owner == username && p.is_open())
        .map(|p| &p.item_id)
        .collect();

    for item in items.iter_mut() {
        if item.posted_for_redistribution && !offered.contains(&item.id) {
            tracing::warn!(user = username, item_id = %item.id, "no open post for flagged item; clearing flag");
            item.posted_for_redistribution = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use zerospoil_store::MemoryStore;

    fn draft(product: &str) -> ItemDraft {
        ItemDraft {
            store_id: "S1".into(),
            store_name: "Corner".into(),
            store_address: "1 High St".into(),
            product: product.into(),
            qty: Some(Decimal::new(4, 0)),
            expiry_date: NaiveDate::from_ymd_opt(2026, 10, 30),
            category: Some("Dairy".into()),
        }
    }

    fn setup() -> (Ledger, InventorySession) {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()));
        let session = InventorySession::load(&ledger, "alice").unwrap();
        (ledger, session)
    }

    #[test]
    fn add_edit_remove_persist() {
        let (ledger, mut session) = setup();
        let id = session.add_item(&ledger, draft("Milk"), Utc::now()).unwrap();
        session.edit_item(&ledger, &id, draft("Oat milk")).unwrap();

        let reloaded = InventorySession::load(&ledger, "alice").unwrap();
        assert_eq!(reloaded.find(&id).unwrap().product, "Oat milk");

        session.remove_item(&ledger, &id).unwrap();
        assert!(ledger.inventory("alice").unwrap().is_empty());
    }

    #[test]
    fn invalid_edit_changes_nothing() {
        let (ledger, mut session) = setup();
        let id = session.add_item(&ledger, draft("Milk"), Utc::now()).unwrap();
        let mut bad = draft("Milk");
        bad.qty = Some(Decimal::new(-1, 0));
        assert!(session.edit_item(&ledger, &id, bad).is_err());
        assert_eq!(ledger.inventory("alice").unwrap()[0].qty, Decimal::new(4, 0));
    }

    #[test]
    fn posted_items_are_locked() {
        let (ledger, mut session) = setup();
        let id = session.add_item(&ledger, draft("Milk"), Utc::now()).unwrap();
        let item = session.find(&id).unwrap().clone();
        ledger
            .save_board(&[BoardPost::offer("alice", &item, Utc::now())])
            .unwrap();
        session.find_mut(&id).unwrap().posted_for_redistribution = true;
        session.save(&ledger).unwrap();

        assert!(matches!(
            session.remove_item(&ledger, &id),
            Err(ZeroSpoilError::ItemLocked)
        ));
        assert!(matches!(
            session.edit_item(&ledger, &id, draft("Cheese")),
            Err(ZeroSpoilError::ItemLocked)
        ));
    }

    #[test]
    fn clear_keeps_posted_items() {
        let (ledger, mut session) = setup();
        assert!(matches!(
            session.clear_unposted(&ledger),
            Err(ZeroSpoilError::NothingToClear)
        ));
        let keep = session.add_item(&ledger, draft("Milk"), Utc::now()).unwrap();
        session.add_item(&ledger, draft("Eggs"), Utc::now()).unwrap();
        let item = session.find(&keep).unwrap().clone();
        ledger
            .save_board(&[BoardPost::offer("alice", &item, Utc::now())])
            .unwrap();
        session.find_mut(&keep).unwrap().posted_for_redistribution = true;

        assert_eq!(session.clear_unposted(&ledger).unwrap(), 1);
        assert_eq!(session.items().len(), 1);
        assert_eq!(session.items()[0].id, keep);
    }

    #[test]
    fn orphaned_flag_is_repaired_on_load() {
        let (ledger, mut session) = setup();
        let id = session.add_item(&ledger, draft("Milk"), Utc::now()).unwrap();
        session.find_mut(&id).unwrap().posted_for_redistribution = true;
        session.save(&ledger).unwrap();

        let reloaded = InventorySession::load(&ledger, "alice").unwrap();
        assert!(!reloaded.find(&id).unwrap().posted_for_redistribution);
    }
}
