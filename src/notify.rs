//! User-Visible Notifications
//!
//! Toast-style messages produced at operation boundaries. Failures never
//! propagate past the operation that hit them; they end up here.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NotifyLevel::Success, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NotifyLevel::Info, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NotifyLevel::Error, message: message.into() }
    }
}

/// Sink for notifications; the UI layer renders whatever arrives
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotifyLevel::Error => log::error!("[notify] {}", notification.message),
            _ => log::info!("[notify] {}", notification.message),
        }
    }
}

/// Queue of notifications waiting to be shown
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).last().cloned()
    }

    /// Drain everything queued so far
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        LogNotifier.notify(notification.clone());
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }
}
