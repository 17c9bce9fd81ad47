//! Cross-tab refresh: reload the user's view whenever another tab or
//! process writes a collection that view depends on.

use crate::ledger::Ledger;
use crate::notify::Inbox;
use crate::session::InventorySession;
use zerospoil_core::error::ZeroSpoilResult;
use zerospoil_core::BoardPost;
use zerospoil_store::keys::{inventory_key, notifications_key, BOARD_KEY, USERS_KEY};
use zerospoil_store::{ChangeSource, StorageEvent};

/// Everything one logged-in tab shows.
#[derive(Debug, Clone)]
pub struct AppView {
    pub inventory: InventorySession,
    /// Full board, including exhausted posts; filter with
    /// [`open_posts`](crate::reconcile::open_posts) before display.
    pub board: Vec<BoardPost>,
    pub inbox: Inbox,
}

impl AppView {
    pub fn load(ledger: &Ledger, username: &str) -> ZeroSpoilResult<Self> {
        Ok(Self {
            inventory: InventorySession::load(ledger, username)?,
            board: ledger.board()?,
            inbox: Inbox::load(ledger, username)?,
        })
    }

    pub fn username(&self) -> &str {
        self.inventory.username()
    }

    pub fn reload(&mut self, ledger: &Ledger) -> ZeroSpoilResult<()> {
        self.inventory.reload(ledger)?;
        self.board = ledger.board()?;
        self.inbox = Inbox::load(ledger, self.username())?;
        Ok(())
    }

    /// Keys this view is built from.
    pub fn depends_on(&self, event: &StorageEvent) -> bool {
        let user = self.username();
        event.touches(BOARD_KEY)
            || event.touches(USERS_KEY)
            || event.touches(&inventory_key(user))
            || event.touches(&notifications_key(user))
    }
}

/// Reloads `view` and calls `on_refresh` after every relevant change,
/// until the change source closes.
pub async fn follow_changes<C, F>(
    ledger: &Ledger,
    view: &mut AppView,
    changes: &mut C,
    mut on_refresh: F,
) -> ZeroSpoilResult<()>
where
    C: ChangeSource + ?Sized,
    F: FnMut(&AppView),
{
    while let Some(event) = changes.next_change().await {
        if !view.depends_on(&event) {
            tracing::trace!(key = ?event.key, "ignoring unrelated change");
            continue;
        }
        tracing::debug!(key = ?event.key, user = view.username(), "refreshing view");
        view.reload(ledger)?;
        on_refresh(view);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use zerospoil_store::{KeyValueStore, MemoryStore};

    #[test]
    fn relevance_is_per_user() {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()));
        let view = AppView::load(&ledger, "alice").unwrap();
        assert!(view.depends_on(&StorageEvent::key(BOARD_KEY)));
        assert!(view.depends_on(&StorageEvent::key("zerospoil_alice")));
        assert!(view.depends_on(&StorageEvent::key("zs_notifications_alice")));
        assert!(!view.depends_on(&StorageEvent::key("zerospoil_bob")));
        assert!(view.depends_on(&StorageEvent::resync()));
    }

    /// Replays a fixed list of events, then closes.
    struct Scripted(std::collections::VecDeque<StorageEvent>);

    #[async_trait::async_trait]
    impl ChangeSource for Scripted {
        async fn next_change(&mut self) -> Option<StorageEvent> {
            self.0.pop_front()
        }
    }

    #[tokio::test]
    async fn only_relevant_writes_trigger_reload() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone());
        let mut view = AppView::load(&ledger, "alice").unwrap();

        store
            .set(
                BOARD_KEY,
                r#"[{"postId":"p1","owner":"bob","itemId":"i1","product":"Pears","qtyTotal":4,"qtyRemaining":4,"claims":[]}]"#,
            )
            .unwrap();
        let mut changes = Scripted(
            [
                StorageEvent::key("zerospoil_bob"),
                StorageEvent::key(BOARD_KEY),
                StorageEvent::key("zs_notifications_bob"),
            ]
            .into_iter()
            .collect(),
        );

        let mut refreshes = Vec::new();
        follow_changes(&ledger, &mut view, &mut changes, |v| {
            refreshes.push(v.board.len())
        })
        .await
        .unwrap();

        assert_eq!(refreshes, vec![1]);
        assert_eq!(view.board[0].product, "Pears");
    }
}
