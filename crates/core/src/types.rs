//! Domain types for the ZeroSpoil inventory and redistribution board.

use crate::config::{DEFAULT_CATEGORY, QTY_DECIMALS};
use crate::error::{ZeroSpoilError, ZeroSpoilResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Fresh random (UUID v4) identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Stable identifier of an inventory item. Legacy records may carry
    /// non-UUID ids; those are kept verbatim.
    ItemId
);
opaque_id!(PostId);
opaque_id!(NotificationId);

// ---------------------------------------------------------------------------
// Quantities
// ---------------------------------------------------------------------------

/// Rounds a settled quantity to 2 decimal places, midpoint away from zero.
#[inline]
pub fn round_qty(qty: Decimal) -> Decimal {
    qty.round_dp_with_strategy(QTY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats kilograms without trailing zeros (`10`, `2.5`).
pub fn format_qty(qty: Decimal) -> String {
    qty.normalize().to_string()
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// One item in a user's inventory. Owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: ItemId,
    pub store_id: String,
    pub store_name: String,
    pub store_address: String,
    pub product: String,
    /// Kilograms on hand, including any quantity offered on the board.
    pub qty: Decimal,
    /// `None` only for legacy records whose date could not be recovered.
    pub expiry_date: Option<NaiveDate>,
    pub category: String,
    pub posted_for_redistribution: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
    /// Builds a new, unposted item from a draft that passed validation.
    pub fn from_draft(draft: ItemDraft, now: DateTime<Utc>) -> ZeroSpoilResult<Self> {
        let valid = draft.validate()?;
        Ok(Self {
            id: ItemId::generate(),
            store_id: valid.store_id,
            store_name: valid.store_name,
            store_address: valid.store_address,
            product: valid.product,
            qty: valid.qty,
            expiry_date: Some(valid.expiry_date),
            category: valid.category,
            posted_for_redistribution: false,
            created_at: Some(now),
        })
    }

    /// Overwrites the editable fields. Id, creation time and posted flag stay.
    pub fn apply_draft(&mut self, draft: ItemDraft) -> ZeroSpoilResult<()> {
        let valid = draft.validate()?;
        self.store_id = valid.store_id;
        self.store_name = valid.store_name;
        self.store_address = valid.store_address;
        self.product = valid.product;
        self.qty = valid.qty;
        self.expiry_date = Some(valid.expiry_date);
        self.category = valid.category;
        Ok(())
    }
}

/// User-supplied fields for adding or editing an item.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub store_id: String,
    pub store_name: String,
    pub store_address: String,
    pub product: String,
    pub qty: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    pub category: Option<String>,
}

impl From<&InventoryItem> for ItemDraft {
    /// Starting point for a partial edit.
    fn from(item: &InventoryItem) -> Self {
        Self {
            store_id: item.store_id.clone(),
            store_name: item.store_name.clone(),
            store_address: item.store_address.clone(),
            product: item.product.clone(),
            qty: Some(item.qty),
            expiry_date: item.expiry_date,
            category: Some(item.category.clone()),
        }
    }
}

struct ValidDraft {
    store_id: String,
    store_name: String,
    store_address: String,
    product: String,
    qty: Decimal,
    expiry_date: NaiveDate,
    category: String,
}

impl ItemDraft {
    fn validate(self) -> ZeroSpoilResult<ValidDraft> {
        let required = [
            ("storeId", &self.store_id),
            ("storeName", &self.store_name),
            ("storeAddress", &self.store_address),
            ("product", &self.product),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ZeroSpoilError::InvalidInput(format!(
                    "Field \"{field}\" is required."
                )));
            }
        }

        let qty = self
            .qty
            .ok_or_else(|| ZeroSpoilError::InvalidInput("Field \"qty\" is required.".into()))?;
        if qty <= Decimal::ZERO {
            return Err(ZeroSpoilError::InvalidInput(
                "Quantity must be greater than 0.".into(),
            ));
        }

        let expiry_date = self
            .expiry_date
            .ok_or_else(|| ZeroSpoilError::InvalidInput("Please select a valid date.".into()))?;

        let category = match self.category {
            Some(c) if !c.trim().is_empty() => c.trim().to_string(),
            _ => DEFAULT_CATEGORY.to_string(),
        };

        Ok(ValidDraft {
            store_id: self.store_id.trim().to_string(),
            store_name: self.store_name.trim().to_string(),
            store_address: self.store_address.trim().to_string(),
            product: self.product.trim().to_string(),
            qty: round_qty(qty),
            expiry_date,
            category,
        })
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// One claim against a board post. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub claimant: String,
    pub qty: Decimal,
    pub at: DateTime<Utc>,
}

/// An item's redistribution offer, visible to every user.
///
/// Holds `qty_remaining == qty_total - sum(claims.qty)`, never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPost {
    pub post_id: PostId,
    pub owner: String,
    /// Back-reference into the owner's inventory.
    pub item_id: ItemId,
    pub store_id: String,
    pub store_name: String,
    pub store_address: String,
    pub product: String,
    pub expiry_date: Option<NaiveDate>,
    pub category: String,
    pub qty_total: Decimal,
    pub qty_remaining: Decimal,
    /// Most posts see a handful of claims; keep them inline.
    pub claims: SmallVec<[Claim; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl BoardPost {
    /// Snapshots `item` into a fresh post with nothing claimed yet.
    pub fn offer(owner: &str, item: &InventoryItem, now: DateTime<Utc>) -> Self {
        Self {
            post_id: PostId::generate(),
            owner: owner.to_string(),
            item_id: item.id.clone(),
            store_id: item.store_id.clone(),
            store_name: item.store_name.clone(),
            store_address: item.store_address.clone(),
            product: item.product.clone(),
            expiry_date: item.expiry_date,
            category: item.category.clone(),
            qty_total: item.qty,
            qty_remaining: item.qty,
            claims: SmallVec::new(),
            created_at: Some(now),
        }
    }

    /// Appends a claim and settles the remaining quantity.
    ///
    /// Callers check `qty <= qty_remaining` first; the result is clamped
    /// at zero regardless.
    pub fn record_claim(&mut self, claimant: &str, qty: Decimal, at: DateTime<Utc>) {
        self.claims.push(Claim {
            claimant: claimant.to_string(),
            qty,
            at,
        });
        self.qty_remaining = round_qty(self.qty_remaining - qty).max(Decimal::ZERO);
    }

    pub fn claimed_total(&self) -> Decimal {
        self.claims.iter().map(|c| c.qty).sum()
    }

    /// Posts with nothing left are hidden from the board view.
    pub fn is_open(&self) -> bool {
        self.qty_remaining > Decimal::ZERO
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Structured reference carried alongside the rendered message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    #[serde(default)]
    pub payload: NotificationPayload,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(message: String, payload: NotificationPayload, now: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::generate(),
            message,
            payload,
            read: false,
            created_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub username: String,
    /// Lowercase hex SHA-256 of the password.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub username: String,
    pub login_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ItemDraft {
        ItemDraft {
            store_id: " S1 ".into(),
            store_name: "Corner Shop".into(),
            store_address: "1 High St".into(),
            product: "Bananas".into(),
            qty: Some(Decimal::new(10, 0)),
            expiry_date: NaiveDate::from_ymd_opt(2026, 10, 20),
            category: None,
        }
    }

    #[test]
    fn draft_defaults_category_and_trims() {
        let item = InventoryItem::from_draft(draft(), Utc::now()).unwrap();
        assert_eq!(item.category, "Other");
        assert_eq!(item.store_id, "S1");
        assert!(!item.posted_for_redistribution);
    }

    #[test]
    fn draft_rejects_missing_field() {
        let mut d = draft();
        d.product = "  ".into();
        let err = InventoryItem::from_draft(d, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("\"product\""));
    }

    #[test]
    fn draft_rejects_non_positive_qty() {
        let mut d = draft();
        d.qty = Some(Decimal::ZERO);
        assert!(matches!(
            InventoryItem::from_draft(d, Utc::now()),
            Err(ZeroSpoilError::InvalidInput(_))
        ));
    }

    #[test]
    fn draft_rejects_missing_date() {
        let mut d = draft();
        d.expiry_date = None;
        assert!(InventoryItem::from_draft(d, Utc::now()).is_err());
    }

    #[test]
    fn claim_settles_remaining() {
        let item = InventoryItem::from_draft(draft(), Utc::now()).unwrap();
        let mut post = BoardPost::offer("alice", &item, Utc::now());
        post.record_claim("bob", Decimal::new(333, 2), Utc::now());
        post.record_claim("carol", Decimal::new(1, 0), Utc::now());
        assert_eq!(post.qty_remaining, Decimal::new(567, 2));
        assert_eq!(post.qty_total - post.claimed_total(), post.qty_remaining);
        assert!(post.is_open());
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_qty(Decimal::new(1005, 3)), Decimal::new(101, 2));
        assert_eq!(format_qty(Decimal::new(1000, 2)), "10");
    }

    #[test]
    fn post_serializes_camel_case() {
        let item = InventoryItem::from_draft(draft(), Utc::now()).unwrap();
        let post = BoardPost::offer("alice", &item, Utc::now());
        let json = serde_json::to_value(&post).unwrap();
        assert!(json.get("qtyRemaining").is_some());
        assert!(json["claims"].as_array().unwrap().is_empty());
        assert_eq!(json["qtyTotal"], serde_json::json!(10.0));
    }
}
