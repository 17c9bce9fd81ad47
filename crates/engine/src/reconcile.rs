//! Board post lifecycle and cross-user inventory settlement.
//!
//! Posting and claiming touch up to three collections (board, an owner's
//! inventory, one or more inboxes). There is no transaction: effects are
//! ordered so that every precondition is checked before the first write,
//! and each collection is re-read right before it is written. Two tabs
//! settling claims at the same moment can still overwrite each other's
//! board or inventory write; the last write wins.

use crate::ledger::Ledger;
use crate::notify;
use crate::session::InventorySession;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use zerospoil_core::error::{ZeroSpoilError, ZeroSpoilResult};
use zerospoil_core::{format_qty, round_qty, BoardPost, ItemId, NotificationPayload, PostId};

/// Offers one of the session user's items on the board.
///
/// Notifies every other registered user. The item keeps its full
/// quantity; it is only flagged.
pub fn post_for_redistribution(
    ledger: &Ledger,
    session: &mut InventorySession,
    item_id: &ItemId,
    now: DateTime<Utc>,
) -> ZeroSpoilResult<BoardPost> {
    let owner = session.username().to_string();
    let item = session
        .find(item_id)
        .ok_or_else(|| ZeroSpoilError::ItemNotFound(item_id.to_string()))?;

    if item.posted_for_redistribution {
        return Err(ZeroSpoilError::AlreadyPosted);
    }
    if item.qty <= Decimal::ZERO {
        return Err(ZeroSpoilError::InvalidInput(
            "Quantity must be greater than 0.".into(),
        ));
    }

    let mut board = ledger.board()?;
    if board
        .iter()
        .any(|p| p.owner == owner && &p.item_id == item_id && p.is_open())
    {
        return Err(ZeroSpoilError::AlreadyPosted);
    }

    let post = BoardPost::offer(&owner, item, now);
    board.insert(0, post.clone());
    ledger.save_board(&board)?;

    session.find_mut(item_id)?.posted_for_redistribution = true;
    session.save(ledger)?;

    tracing::info!(
        owner = %owner,
        post_id = %post.post_id,
        item_id = %item_id,
        qty = %post.qty_total,
        "item posted for redistribution"
    );

    let message = format!(
        "New redistribution: {} ({} kg) from {}",
        post.product,
        format_qty(post.qty_total),
        post.store_name
    );
    let mut notified = 0usize;
    for user in ledger.users()? {
        if user.username == owner {
            continue;
        }
        notify::push(
            ledger,
            &user.username,
            message.clone(),
            NotificationPayload {
                post_id: Some(post.post_id.clone()),
            },
            now,
        )?;
        notified += 1;
    }
    tracing::debug!(post_id = %post.post_id, notified, "offer broadcast");

    Ok(post)
}

/// Outcome of a successful claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    pub post_id: PostId,
    pub claimed: Decimal,
    /// Remaining on the post after this claim.
    pub remaining: Decimal,
    /// The post left the board.
    pub closed: bool,
    /// The owner's item was used up and removed from their inventory.
    pub depleted: bool,
}

/// Takes `qty` kg from a board post on behalf of `claimant`.
///
/// Checks, first failure wins: the post still exists, the claimant is
/// not its owner, `0 < qty <= remaining`. Nothing is written unless all
/// pass.
pub fn claim(
    ledger: &Ledger,
    claimant: &str,
    post_id: &PostId,
    qty: Decimal,
    now: DateTime<Utc>,
) -> ZeroSpoilResult<ClaimReceipt> {
    let mut board = ledger.board()?;
    let idx = board
        .iter()
        .position(|p| &p.post_id == post_id)
        .ok_or(ZeroSpoilError::PostUnavailable)?;

    if board[idx].owner == claimant {
        return Err(ZeroSpoilError::OwnPost);
    }
    if qty <= Decimal::ZERO {
        return Err(ZeroSpoilError::InvalidInput(
            "Enter a valid positive number.".into(),
        ));
    }
    if qty > board[idx].qty_remaining {
        return Err(ZeroSpoilError::InsufficientRemaining {
            remaining: board[idx].qty_remaining,
        });
    }

    // Checked unrounded above: 5.004 against 5 is an over-claim.
    let qty = round_qty(qty);
    if qty <= Decimal::ZERO {
        return Err(ZeroSpoilError::InvalidInput(
            "Enter a valid positive number.".into(),
        ));
    }

    // 1-2. Record the claim on the post and write the board back.
    board[idx].record_claim(claimant, qty, now);
    let post = board[idx].clone();
    ledger.save_board(&board)?;

    // 3-5. Settle against the owner's inventory.
    let mut closed = false;
    let mut depleted = false;
    let mut inventory = ledger.inventory(&post.owner)?;
    match inventory.iter().position(|i| i.id == post.item_id) {
        Some(i) => {
            let left = round_qty(inventory[i].qty - qty);
            if left <= Decimal::ZERO {
                // Depleted stock closes the post whatever its own bookkeeping says.
                inventory.remove(i);
                depleted = true;
                closed = ledger.close_post(post_id)?;
            } else {
                inventory[i].qty = left;
                if !post.is_open() {
                    inventory[i].posted_for_redistribution = false;
                    closed = ledger.close_post(post_id)?;
                }
            }
            ledger.save_inventory(&post.owner, &inventory)?;
        }
        None => {
            tracing::warn!(
                owner = %post.owner,
                item_id = %post.item_id,
                post_id = %post_id,
                "claimed post has no inventory item; owner stock left untouched"
            );
            if !post.is_open() {
                closed = ledger.close_post(post_id)?;
            }
        }
    }

    tracing::info!(
        claimant,
        owner = %post.owner,
        post_id = %post_id,
        qty = %qty,
        remaining = %post.qty_remaining,
        closed,
        depleted,
        "claim settled"
    );

    // 6. Tell the owner.
    notify::push(
        ledger,
        &post.owner,
        format!(
            "{} claimed {} kg of {} from {}",
            claimant,
            format_qty(qty),
            post.product,
            post.store_name
        ),
        NotificationPayload {
            post_id: Some(post_id.clone()),
        },
        now,
    )?;

    Ok(ClaimReceipt {
        post_id: post_id.clone(),
        claimed: qty,
        remaining: post.qty_remaining,
        closed,
        depleted,
    })
}

/// Posts that still have something to claim, newest first.
pub fn open_posts(board: &[BoardPost]) -> Vec<&BoardPost> {
    board.iter().filter(|p| p.is_open()).collect()
}
