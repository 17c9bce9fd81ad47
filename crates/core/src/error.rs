//! Centralized error types for the ZeroSpoil workspace.

use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level error enum.
///
/// Validation and state-conflict variants carry the text shown to the
/// user who initiated the rejected operation. Corrupt persisted
/// collections never reach this type; they are recovered at load time.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ZeroSpoilError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Already posted to the Redistribution Board.")]
    AlreadyPosted,

    #[error("This item is currently posted for redistribution. It can be changed or removed only after all quantity is claimed.")]
    ItemLocked,

    #[error("This post is no longer available.")]
    PostUnavailable,

    #[error("You cannot claim your own post.")]
    OwnPost,

    #[error("Only {} kg left to claim.", .remaining.normalize())]
    InsufficientRemaining { remaining: Decimal },

    #[error("Nothing to clear.")]
    NothingToClear,

    #[error("Username already exists.")]
    UsernameTaken,

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Not logged in.")]
    NotLoggedIn,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ZeroSpoilError {
    /// Conflicts with current state, as opposed to malformed input or I/O.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            Self::ItemNotFound(_)
                | Self::AlreadyPosted
                | Self::ItemLocked
                | Self::PostUnavailable
                | Self::OwnPost
                | Self::InsufficientRemaining { .. }
                | Self::NothingToClear
                | Self::UsernameTaken
        )
    }
}

pub type ZeroSpoilResult<T> = Result<T, ZeroSpoilError>;
