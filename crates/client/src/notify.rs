//! Transient user-facing notifications.
//!
//! One slot, newest wins. A notification expires on its own; readers ask
//! the slot for the current one at a given instant.

use std::time::{Duration, Instant};

pub const INFO_TTL: Duration = Duration::from_millis(1500);
pub const ERROR_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    shown_at: Instant,
    ttl: Duration,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, message.into(), INFO_TTL)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message.into(), ERROR_TTL)
    }

    fn new(kind: NotificationKind, message: String, ttl: Duration) -> Self {
        Self {
            kind,
            message,
            shown_at: Instant::now(),
            ttl,
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.shown_at + self.ttl
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

#[derive(Debug, Default)]
pub struct NotificationSlot {
    current: Option<Notification>,
}

impl NotificationSlot {
    pub fn show(&mut self, notification: Notification) {
        self.current = Some(notification);
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<&Notification> {
        self.current.as_ref().filter(|n| !n.is_expired_at(now))
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_replaces_oldest() {
        let mut slot = NotificationSlot::default();
        slot.show(Notification::error("first"));
        slot.show(Notification::info("second"));
        let current = slot.current().unwrap();
        assert_eq!(current.message, "second");
        assert_eq!(current.kind, NotificationKind::Info);
    }

    #[test]
    fn info_expires_before_error() {
        let mut slot = NotificationSlot::default();
        let info = Notification::info("Cart updated");
        let start = info.expires_at() - INFO_TTL;
        slot.show(info);
        assert!(slot.current_at(start + Duration::from_millis(1400)).is_some());
        assert!(slot.current_at(start + Duration::from_millis(1500)).is_none());

        let error = Notification::error("Server error");
        let start = error.expires_at() - ERROR_TTL;
        slot.show(error);
        assert!(slot.current_at(start + Duration::from_millis(2900)).is_some());
        assert!(slot.current_at(start + ERROR_TTL).is_none());
    }

    #[test]
    fn dismiss_clears() {
        let mut slot = NotificationSlot::default();
        slot.show(Notification::info("x"));
        slot.dismiss();
        assert!(slot.current().is_none());
    }
}
