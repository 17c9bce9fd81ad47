//! Domain models, quantities, status derivation, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod config;
pub mod error;
pub mod status;
pub mod types;

pub use error::{ZeroSpoilError, ZeroSpoilResult};
pub use status::{days_left, derive_status, Status};
pub use types::{
    format_qty, round_qty, BoardPost, Claim, InventoryItem, ItemDraft, ItemId, Notification,
    NotificationId, NotificationPayload, PostId, SessionRecord, UserAccount,
};
