//! Inventory search, filtering and sorting.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::cmp::Ordering;
use std::str::FromStr;
use zerospoil_core::{InventoryItem, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    StoreId,
    StoreName,
    StoreAddress,
    Product,
    Qty,
    Expiry,
    Category,
    Status,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Ok(match key.as_str() {
            "storeid" => SortKey::StoreId,
            "storename" | "store" => SortKey::StoreName,
            "storeaddress" | "address" => SortKey::StoreAddress,
            "product" => SortKey::Product,
            "qty" | "quantity" => SortKey::Qty,
            "expiry" | "expirydate" | "expiryiso" => SortKey::Expiry,
            "category" => SortKey::Category,
            "status" => SortKey::Status,
            _ => return Err(format!("unknown sort column {s:?}")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// An item paired with its derived status, ready for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView<'a> {
    #[serde(flatten)]
    pub item: &'a InventoryItem,
    pub status: Status,
    pub days_left: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryQuery {
    /// Case-insensitive substring of product, store name or store id.
    pub search: Option<String>,
    pub status: Option<Status>,
    pub category: Option<String>,
    pub sort: Option<(SortKey, SortDirection)>,
}

impl InventoryQuery {
    pub fn apply<'a>(&self, items: &'a [InventoryItem], now: NaiveDateTime) -> Vec<ItemView<'a>> {
        let needle = self
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut views: Vec<ItemView<'a>> = items
            .iter()
            .map(|item| ItemView {
                item,
                status: item.status(now),
                days_left: item.days_left(now),
            })
            .filter(|v| match &needle {
                Some(q) => [&v.item.product, &v.item.store_name, &v.item.store_id]
                    .iter()
                    .any(|field| field.to_lowercase().contains(q.as_str())),
                None => true,
            })
            .filter(|v| self.status.map_or(true, |s| v.status == s))
            .filter(|v| {
                self.category
                    .as_deref()
                    .map_or(true, |c| v.item.category == c)
            })
            .collect();

        if let Some((key, direction)) = self.sort {
            // Stable: equal rows keep insertion order.
            views.sort_by(|a, b| {
                let ord = compare(key, a, b);
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
        views
    }
}

fn compare(key: SortKey, a: &ItemView<'_>, b: &ItemView<'_>) -> Ordering {
    let text = |x: &str, y: &str| x.to_lowercase().cmp(&y.to_lowercase());
    let (x, y) = (a.item, b.item);
    match key {
        SortKey::StoreId => text(&x.store_id, &y.store_id),
        SortKey::StoreName => text(&x.store_name, &y.store_name),
        SortKey::StoreAddress => text(&x.store_address, &y.store_address),
        SortKey::Product => text(&x.product, &y.product),
        SortKey::Category => text(&x.category, &y.category),
        SortKey::Qty => x.qty.cmp(&y.qty),
        SortKey::Expiry => expiry_order(x.expiry_date, y.expiry_date),
        SortKey::Status => a.status.cmp(&b.status),
    }
}

/// Items without a date sort after every dated item.
fn expiry_order(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use zerospoil_core::ItemId;

    fn item(product: &str, store: &str, qty: i64, day: u32, category: &str) -> InventoryItem {
        InventoryItem {
            id: ItemId::generate(),
            store_id: format!("{store}-id"),
            store_name: store.into(),
            store_address: "addr".into(),
            product: product.into(),
            qty: Decimal::new(qty, 0),
            expiry_date: NaiveDate::from_ymd_opt(2026, 10, day),
            category: category.into(),
            posted_for_redistribution: false,
            created_at: None,
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn sample() -> Vec<InventoryItem> {
        vec![
            item("bananas", "Corner", 10, 17, "Fruit"),
            item("Apples", "Market", 2, 30, "Fruit"),
            item("Milk", "corner", 5, 25, "Dairy"),
        ]
    }

    #[test]
    fn search_matches_product_or_store() {
        let items = sample();
        let q = InventoryQuery {
            search: Some("CORNER".into()),
            ..Default::default()
        };
        assert_eq!(q.apply(&items, now()).len(), 2);
    }

    #[test]
    fn filters_by_status_and_category() {
        let items = sample();
        let q = InventoryQuery {
            status: Some(Status::NearExpiry),
            ..Default::default()
        };
        let near = q.apply(&items, now());
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].item.product, "bananas");

        let q = InventoryQuery {
            category: Some("Fruit".into()),
            ..Default::default()
        };
        assert_eq!(q.apply(&items, now()).len(), 2);
    }

    #[test]
    fn sorts_case_insensitively_and_numerically() {
        let items = sample();
        let by_product = InventoryQuery {
            sort: Some((SortKey::Product, SortDirection::Ascending)),
            ..Default::default()
        };
        let names: Vec<&str> = by_product
            .apply(&items, now())
            .iter()
            .map(|v| v.item.product.as_str())
            .collect();
        assert_eq!(names, ["Apples", "bananas", "Milk"]);

        let by_qty = InventoryQuery {
            sort: Some((SortKey::Qty, SortDirection::Descending)),
            ..Default::default()
        };
        let qtys: Vec<Decimal> = by_qty.apply(&items, now()).iter().map(|v| v.item.qty).collect();
        assert_eq!(qtys, [Decimal::new(10, 0), Decimal::new(5, 0), Decimal::new(2, 0)]);
    }

    #[test]
    fn parses_sort_keys() {
        assert_eq!("storeName".parse::<SortKey>().unwrap(), SortKey::StoreName);
        assert_eq!("expiryISO".parse::<SortKey>().unwrap(), SortKey::Expiry);
        assert!("colour".parse::<SortKey>().is_err());
    }
}
