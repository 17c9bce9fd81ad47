//! Account registration, login, and session records.
//!
//! Passwords are stored as unsalted SHA-256 hex digests. This guards a
//! shared device against casual snooping and nothing more.

use crate::ledger::Ledger;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use zerospoil_core::config::MIN_PASSWORD_LEN;
use zerospoil_core::error::{ZeroSpoilError, ZeroSpoilResult};
use zerospoil_core::{SessionRecord, UserAccount};
use zerospoil_store::keys::SESSION_KEY;
use zerospoil_store::KeyValueStore;

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Account store plus the two places a session can live: the tab's own
/// store (forgotten with the tab) and the shared store ("remember me").
pub struct Accounts {
    ledger: Ledger,
    tab: Arc<dyn KeyValueStore>,
}

impl Accounts {
    pub fn new(ledger: Ledger, tab: Arc<dyn KeyValueStore>) -> Self {
        Self { ledger, tab }
    }

    pub fn register(
        &self,
        username: &str,
        password: &str,
        confirm: &str,
        now: DateTime<Utc>,
    ) -> ZeroSpoilResult<UserAccount> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() || confirm.is_empty() {
            return Err(ZeroSpoilError::InvalidInput("All fields are required.".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ZeroSpoilError::InvalidInput(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters."
            )));
        }
        if password != confirm {
            return Err(ZeroSpoilError::InvalidInput("Passwords do not match.".into()));
        }

        let mut users = self.ledger.users()?;
        if find_user(&users, username).is_some() {
            return Err(ZeroSpoilError::UsernameTaken);
        }

        let account = UserAccount {
            username: username.to_string(),
            password_hash: hash_password(password),
            created_at: now,
        };
        users.push(account.clone());
        self.ledger.save_users(&users)?;
        tracing::info!(username, "account registered");
        Ok(account)
    }

    /// Verifies credentials and records the session. Unknown user and
    /// wrong password are indistinguishable to the caller.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        remember: bool,
        now: DateTime<Utc>,
    ) -> ZeroSpoilResult<SessionRecord> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ZeroSpoilError::InvalidInput(
                "Enter username and password.".into(),
            ));
        }

        let users = self.ledger.users()?;
        let user = find_user(&users, username).ok_or(ZeroSpoilError::InvalidCredentials)?;
        if hash_password(password) != user.password_hash {
            tracing::debug!(username, "password mismatch");
            return Err(ZeroSpoilError::InvalidCredentials);
        }

        let session = SessionRecord {
            username: user.username.clone(),
            login_at: now,
        };
        let text = serde_json::to_string(&session)
            .map_err(|e| ZeroSpoilError::Internal(format!("Failed to encode session: {e}")))?;
        self.scope(remember).set(SESSION_KEY, &text)?;
        tracing::info!(username = %session.username, remember, "logged in");
        Ok(session)
    }

    /// The tab's own session wins over a remembered one.
    pub fn current_session(&self) -> ZeroSpoilResult<Option<SessionRecord>> {
        for store in [&self.tab, self.ledger.store()] {
            let Some(text) = store.get(SESSION_KEY)? else {
                continue;
            };
            match serde_json::from_str::<Option<SessionRecord>>(&text) {
                Ok(Some(session)) => return Ok(Some(session)),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "unreadable session record; ignoring"),
            }
        }
        Ok(None)
    }

    pub fn require_session(&self) -> ZeroSpoilResult<SessionRecord> {
        self.current_session()?.ok_or(ZeroSpoilError::NotLoggedIn)
    }

    pub fn logout(&self) -> ZeroSpoilResult<()> {
        self.tab.remove(SESSION_KEY)?;
        self.ledger.store().remove(SESSION_KEY)?;
        tracing::info!("logged out");
        Ok(())
    }

    fn scope(&self, remember: bool) -> &Arc<dyn KeyValueStore> {
        if remember {
            self.ledger.store()
        } else {
            &self.tab
        }
    }
}

/// Usernames are unique ignoring ASCII/Unicode case.
fn find_user<'a>(users: &'a [UserAccount], username: &str) -> Option<&'a UserAccount> {
    let wanted = username.to_lowercase();
    users.iter().find(|u| u.username.to_lowercase() == wanted)
}
