//! User-facing notifications emitted after mutations.

use log::{info, warn};
use std::sync::Mutex;

pub const SAVE_LISTS_FAILED: &str = "Failed to save data. Storage might be full.";
pub const SAVE_TODOS_FAILED: &str = "Failed to save todo. Storage might be full.";

/// Purely informational; nothing a notifier does feeds back into the store.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn warning(&self, message: &str);
}

/// Routes notifications to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, message: &str) {
        info!("event=notify kind=success message={:?}", message);
    }

    fn warning(&self, message: &str) {
        warn!("event=notify kind=warning message={:?}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Warning(String),
}

/// Keeps every notification for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Warning(message) => Some(message),
                Notification::Success(_) => None,
            })
            .collect()
    }

    pub fn last(&self) -> Option<Notification> {
        self.notifications().pop()
    }

    fn push(&self, notification: Notification) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(notification);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.push(Notification::Success(message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.push(Notification::Warning(message.to_string()));
    }
}
