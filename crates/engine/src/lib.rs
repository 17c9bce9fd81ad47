//! ZeroSpoil engine: per-user inventory, the shared redistribution board,
//! and the settlement that keeps the two consistent.
//!
//! Everything here reads and writes through a [`Ledger`] over a shared
//! [`KeyValueStore`](zerospoil_store::KeyValueStore). Operations are
//! synchronous; only [`refresh::follow_changes`] awaits, on a change feed.

pub mod auth;
pub mod ledger;
pub mod migrate;
pub mod notify;
pub mod query;
pub mod reconcile;
pub mod refresh;
pub mod report;
pub mod session;

pub use auth::Accounts;
pub use ledger::Ledger;
pub use notify::Inbox;
pub use query::{InventoryQuery, ItemView, SortDirection, SortKey};
pub use reconcile::{claim, open_posts, post_for_redistribution, ClaimReceipt};
pub use refresh::{follow_changes, AppView};
pub use session::InventorySession;
