//! Named domain constants.

/// Items expiring within this many days are "Near Expiry".
pub const NEAR_EXPIRY_DAYS: i64 = 2;

/// Notifications shown in the inbox preview.
pub const NOTIFICATION_PREVIEW_LIMIT: usize = 20;

/// Category assigned when none is given.
pub const DEFAULT_CATEGORY: &str = "Other";

pub const MIN_PASSWORD_LEN: usize = 6;

/// Decimal places kept after every quantity settlement.
pub const QTY_DECIMALS: u32 = 2;
