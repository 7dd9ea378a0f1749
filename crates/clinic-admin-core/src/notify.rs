//! Single-slot transient notification channel.
//!
//! Each published notification carries its own expiry. Publishing overwrites
//! the slot, and `tick` only clears the slot once the notification currently
//! in it has expired, so an older notification can never clear a newer one.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How long a notification stays visible by default.
pub const DEFAULT_NOTIFICATION_TTL_SECS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Failure,
}

/// Feedback surfaced after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub head: String,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            head: "Success".into(),
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Failure,
            head: "Error".into(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NotificationKind::Success
    }
}

#[derive(Debug, Clone)]
struct Slot {
    notification: Notification,
    expires_at: DateTime<Utc>,
}

/// Holds at most one live notification.
#[derive(Debug, Clone)]
pub struct NotificationChannel {
    slot: Option<Slot>,
    ttl: Duration,
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_NOTIFICATION_TTL_SECS))
    }
}

impl NotificationChannel {
    pub fn new(ttl: Duration) -> Self {
        Self { slot: None, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Overwrite the slot; the new notification expires `ttl` after `now`.
    pub fn publish_at(&mut self, notification: Notification, now: DateTime<Utc>) {
        self.slot = Some(Slot {
            notification,
            expires_at: now + self.ttl,
        });
    }

    /// Clear the slot if its notification has expired. Returns whether it was cleared.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        let expired = self
            .slot
            .as_ref()
            .is_some_and(|slot| now >= slot.expires_at);
        if expired {
            self.slot = None;
        }
        expired
    }

    /// The notification still visible at `now`.
    pub fn current(&self, now: DateTime<Utc>) -> Option<&Notification> {
        self.slot
            .as_ref()
            .filter(|slot| now < slot.expires_at)
            .map(|slot| &slot.notification)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.slot.as_ref().map(|slot| slot.expires_at)
    }
}
