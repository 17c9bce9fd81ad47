//! Per-user notification inbox.

use crate::ledger::Ledger;
use chrono::{DateTime, Utc};
use zerospoil_core::config::NOTIFICATION_PREVIEW_LIMIT;
use zerospoil_core::error::ZeroSpoilResult;
use zerospoil_core::{Notification, NotificationPayload};

/// Prepends a notification to `recipient`'s inbox.
pub fn push(
    ledger: &Ledger,
    recipient: &str,
    message: String,
    payload: NotificationPayload,
    now: DateTime<Utc>,
) -> ZeroSpoilResult<Notification> {
    let notification = Notification::new(message, payload, now);
    let mut inbox = ledger.notifications(recipient)?;
    inbox.insert(0, notification.clone());
    ledger.save_notifications(recipient, &inbox)?;
    tracing::debug!(recipient, notification_id = %notification.id, "notification queued");
    Ok(notification)
}

/// Snapshot of one user's notifications, newest first.
#[derive(Debug, Clone)]
pub struct Inbox {
    username: String,
    notifications: Vec<Notification>,
}

impl Inbox {
    pub fn load(ledger: &Ledger, username: &str) -> ZeroSpoilResult<Self> {
        Ok(Self {
            username: username.to_string(),
            notifications: ledger.notifications(username)?,
        })
    }

    pub fn all(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    /// The preview shown to the user.
    pub fn recent(&self) -> &[Notification] {
        let n = self.notifications.len().min(NOTIFICATION_PREVIEW_LIMIT);
        &self.notifications[..n]
    }

    /// Re-reads storage, flips every notification to read and saves.
    pub fn mark_all_read(&mut self, ledger: &Ledger) -> ZeroSpoilResult<usize> {
        let mut notifications = ledger.notifications(&self.username)?;
        let flipped = notifications.iter().filter(|n| !n.read).count();
        for n in &mut notifications {
            n.read = true;
        }
        ledger.save_notifications(&self.username, &notifications)?;
        self.notifications = notifications;
        Ok(flipped)
    }
}
