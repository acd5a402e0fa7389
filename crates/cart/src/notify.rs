//! User-facing notifications.
//!
//! Cart operations never return their failures to the caller; they hand a
//! short message to a [`NotificationSink`] instead, the way a storefront
//! shows an error toast.

use std::sync::{Mutex, PoisonError};

/// Displays user-facing error messages.
pub trait NotificationSink: Send + Sync {
    /// Show an error message to the shopper.
    fn error(&self, message: &str);
}

/// Sink that emits every notification as a `warn` event on the
/// `notification` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn error(&self, message: &str) {
        tracing::warn!(target: "notification", "{message}");
    }
}

/// A notification captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
}

/// Sink that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Just the messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .map(|n| n.message)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl NotificationSink for RecordingSink {
    fn error(&self, message: &str) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Notification {
                message: message.to_string(),
            });
    }
}
