//! Load-time normalization of persisted records.
//!
//! Collections carry no schema version. Older records may lack fields
//! (`id`, `category`, the posted flag), use older names (`redistribute`,
//! `expiryISO`, `takers`/`username`) or store the expiry as `dd/mm/yyyy`
//! in an `expiry` field. Everything is funnelled through the raw shapes
//! below, once, before business logic sees it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;
use zerospoil_core::config::DEFAULT_CATEGORY;
use zerospoil_core::{round_qty, BoardPost, Claim, InventoryItem, ItemId, PostId};

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

/// Accepts a string or a number; anything else reads as missing.
fn lenient_text<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts a JSON number or a numeric string.
fn lenient_qty<'de, D>(de: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::Number(n)) => parse_decimal(&n.to_string()),
        Some(Value::String(s)) => parse_decimal(s.trim()),
        _ => None,
    })
}

fn lenient_flag<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        _ => false,
    })
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn parse_timestamp(s: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Strict `YYYY-MM-DD`.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let well_formed = s.len() == 10
        && s.bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    if !well_formed {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Legacy `d/m/yyyy` (one or two digit day and month). Rejects
/// impossible dates such as 31/02/2024.
pub fn parse_dmy_date(s: &str) -> Option<NaiveDate> {
    let mut parts = s.trim().split('/');
    let (dd, mm, yyyy) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let digits = |p: &str, min: usize, max: usize| {
        (min..=max).contains(&p.len()) && p.bytes().all(|b| b.is_ascii_digit())
    };
    if !digits(dd, 1, 2) || !digits(mm, 1, 2) || !digits(yyyy, 4, 4) {
        return None;
    }
    NaiveDate::from_ymd_opt(yyyy.parse().ok()?, mm.parse().ok()?, dd.parse().ok()?)
}

fn legacy_expiry(s: &str) -> Option<NaiveDate> {
    parse_iso_date(s).or_else(|| parse_dmy_date(s))
}

fn text(v: Option<String>) -> String {
    v.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn category(v: Option<String>) -> String {
    match v {
        Some(c) if !c.trim().is_empty() => c.trim().to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Inventory items
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawItem {
    #[serde(deserialize_with = "lenient_text")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    store_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    store_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    store_address: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    product: Option<String>,
    #[serde(deserialize_with = "lenient_qty")]
    qty: Option<Decimal>,
    #[serde(alias = "expiryISO", deserialize_with = "lenient_text")]
    expiry_date: Option<String>,
    /// Oldest records: ISO or `dd/mm/yyyy`.
    #[serde(deserialize_with = "lenient_text")]
    expiry: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    category: Option<String>,
    #[serde(alias = "redistribute", deserialize_with = "lenient_flag")]
    posted_for_redistribution: bool,
    #[serde(deserialize_with = "lenient_text")]
    created_at: Option<String>,
}

impl RawItem {
    /// No stored id; [`normalize`](Self::normalize) will mint one that must
    /// be written back to stay stable.
    pub fn lacks_id(&self) -> bool {
        self.id.as_deref().map_or(true, str::is_empty)
    }

    pub fn normalize(self) -> InventoryItem {
        let expiry_date = self
            .expiry_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .and_then(parse_iso_date)
            .or_else(|| self.expiry.as_deref().and_then(legacy_expiry));

        let id = match self.id.filter(|s| !s.is_empty()) {
            Some(id) => ItemId::from(id),
            None => {
                let id = ItemId::generate();
                tracing::debug!(item_id = %id, "assigned id to legacy item");
                id
            }
        };

        InventoryItem {
            id,
            store_id: text(self.store_id),
            store_name: text(self.store_name),
            store_address: text(self.store_address),
            product: text(self.product),
            qty: round_qty(self.qty.unwrap_or_default()),
            expiry_date,
            category: category(self.category),
            posted_for_redistribution: self.posted_for_redistribution,
            created_at: parse_timestamp(self.created_at.as_deref()),
        }
    }
}

// ---------------------------------------------------------------------------
// Board posts
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawClaim {
    #[serde(alias = "username", deserialize_with = "lenient_text")]
    claimant: Option<String>,
    #[serde(deserialize_with = "lenient_qty")]
    qty: Option<Decimal>,
    #[serde(deserialize_with = "lenient_text")]
    at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPost {
    #[serde(deserialize_with = "lenient_text")]
    post_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    owner: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    item_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    store_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    store_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    store_address: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    product: Option<String>,
    #[serde(alias = "expiryISO", deserialize_with = "lenient_text")]
    expiry_date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    category: Option<String>,
    #[serde(deserialize_with = "lenient_qty")]
    qty_total: Option<Decimal>,
    #[serde(deserialize_with = "lenient_qty")]
    qty_remaining: Option<Decimal>,
    #[serde(alias = "takers")]
    claims: Vec<RawClaim>,
    #[serde(deserialize_with = "lenient_text")]
    created_at: Option<String>,
}

impl RawPost {
    pub fn lacks_id(&self) -> bool {
        self.post_id.as_deref().map_or(true, str::is_empty)
    }

    pub fn normalize(self) -> BoardPost {
        let claims: Vec<Claim> = self
            .claims
            .into_iter()
            .map(|c| Claim {
                claimant: text(c.claimant),
                qty: round_qty(c.qty.unwrap_or_default()),
                at: parse_timestamp(c.at.as_deref()).unwrap_or_default(),
            })
            .collect();
        let claimed: Decimal = claims.iter().map(|c| c.qty).sum();

        // Whichever side is missing is recovered from the claim history.
        let (qty_total, qty_remaining) = match (self.qty_total, self.qty_remaining) {
            (Some(total), Some(remaining)) => (total, remaining),
            (Some(total), None) => (total, total - claimed),
            (None, Some(remaining)) => (remaining + claimed, remaining),
            (None, None) => (claimed, Decimal::ZERO),
        };

        BoardPost {
            post_id: self
                .post_id
                .filter(|s| !s.is_empty())
                .map(PostId::from)
                .unwrap_or_else(PostId::generate),
            owner: text(self.owner),
            item_id: ItemId::from(text(self.item_id)),
            store_id: text(self.store_id),
            store_name: text(self.store_name),
            store_address: text(self.store_address),
            product: text(self.product),
            expiry_date: self.expiry_date.as_deref().and_then(legacy_expiry),
            category: category(self.category),
            qty_total: round_qty(qty_total),
            qty_remaining: round_qty(qty_remaining).max(Decimal::ZERO),
            claims: claims.into_iter().collect(),
            created_at: parse_timestamp(self.created_at.as_deref()),
        }
    }
}
