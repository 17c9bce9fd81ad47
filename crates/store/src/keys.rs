//! Storage key layout.

/// Registered accounts.
pub const USERS_KEY: &str = "zs_users";

/// Logged-in session record (tab-scoped or persistent store).
pub const SESSION_KEY: &str = "zs_session";

/// Shared redistribution board.
pub const BOARD_KEY: &str = "zs_board";

pub fn inventory_key(username: &str) -> String {
    format!("zerospoil_{username}")
}

pub fn notifications_key(username: &str) -> String {
    format!("zs_notifications_{username}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_user_keys() {
        assert_eq!(inventory_key("alice"), "zerospoil_alice");
        assert_eq!(notifications_key("bob"), "zs_notifications_bob");
    }
}
