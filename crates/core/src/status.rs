//! Display status, derived on every read and never persisted.

use crate::config::NEAR_EXPIRY_DAYS;
use crate::types::InventoryItem;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    Fresh,
    NearExpiry,
    Redistributing,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Fresh => "Fresh",
            Status::NearExpiry => "Near Expiry",
            Status::Redistributing => "Redistributing",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "fresh" => Ok(Status::Fresh),
            "nearexpiry" | "near" => Ok(Status::NearExpiry),
            "redistributing" => Ok(Status::Redistributing),
            _ => Err(format!(
                "unknown status {s:?}; expected Fresh, Near Expiry or Redistributing"
            )),
        }
    }
}

/// Whole days until the end (23:59:59) of `expiry`, rounded up.
///
/// An item expiring later today reports 1; one that expired yesterday
/// reports 0 or less.
pub fn days_left(expiry: NaiveDate, now: NaiveDateTime) -> i64 {
    let end_of_day = expiry
        .and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| expiry.and_time(NaiveTime::default()));
    let millis = (end_of_day - now).num_milliseconds();
    let whole = millis / MILLIS_PER_DAY;
    if millis % MILLIS_PER_DAY > 0 {
        whole + 1
    } else {
        whole
    }
}

/// Pure status function over `{posted flag, expiry, now}`.
///
/// Items with no recoverable expiry date are treated as `Fresh`.
pub fn derive_status(
    posted: bool,
    expiry: Option<NaiveDate>,
    now: NaiveDateTime,
    near_expiry_days: i64,
) -> Status {
    if posted {
        return Status::Redistributing;
    }
    match expiry {
        Some(date) if days_left(date, now) <= near_expiry_days => Status::NearExpiry,
        _ => Status::Fresh,
    }
}

impl InventoryItem {
    pub fn status(&self, now: NaiveDateTime) -> Status {
        derive_status(
            self.posted_for_redistribution,
            self.expiry_date,
            now,
            NEAR_EXPIRY_DAYS,
        )
    }

    pub fn days_left(&self, now: NaiveDateTime) -> Option<i64> {
        self.expiry_date.map(|d| days_left(d, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn days_left_rounds_up() {
        let now = at(2026, 10, 16, 9);
        assert_eq!(days_left(date(2026, 10, 16), now), 1);
        assert_eq!(days_left(date(2026, 10, 17), now), 2);
        assert_eq!(days_left(date(2026, 10, 25), now), 10);
        assert_eq!(days_left(date(2026, 10, 15), now), 0);
        assert_eq!(days_left(date(2026, 10, 10), now), -5);
    }

    #[test]
    fn near_expiry_threshold() {
        let now = at(2026, 10, 16, 9);
        assert_eq!(
            derive_status(false, Some(date(2026, 10, 17)), now, 2),
            Status::NearExpiry
        );
        assert_eq!(
            derive_status(false, Some(date(2026, 10, 18)), now, 2),
            Status::Fresh
        );
    }

    #[test]
    fn posted_wins_over_expiry() {
        let now = at(2026, 10, 16, 9);
        assert_eq!(
            derive_status(true, Some(date(2026, 10, 1)), now, 2),
            Status::Redistributing
        );
    }

    #[test]
    fn missing_expiry_is_fresh() {
        assert_eq!(
            derive_status(false, None, at(2026, 1, 1, 0), 2),
            Status::Fresh
        );
    }

    #[test]
    fn derivation_is_stable() {
        let now = at(2026, 10, 16, 9);
        let a = derive_status(false, Some(date(2026, 10, 17)), now, 2);
        let b = derive_status(false, Some(date(2026, 10, 17)), now, 2);
        assert_eq!(a, b);
    }

    #[test]
    fn parses_labels() {
        assert_eq!("Near Expiry".parse::<Status>().unwrap(), Status::NearExpiry);
        assert_eq!("near-expiry".parse::<Status>().unwrap(), Status::NearExpiry);
        assert_eq!("fresh".parse::<Status>().unwrap(), Status::Fresh);
        assert!("stale".parse::<Status>().is_err());
    }
}
