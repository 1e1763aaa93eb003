use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Positive,
    Negative,
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn positive(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Positive,
            message: message.into(),
        }
    }

    pub fn negative(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Negative,
            message: message.into(),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.kind == NotificationKind::Negative
    }
}

/// Fire-and-forget sink for notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Process-wide "operation in progress" flag.
///
/// There is no owner tracking: whoever calls `hide` last wins, so an inner
/// operation may clear the flag while an outer one is still running.
pub trait BusyIndicator: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Positive => tracing::info!("{}", notification.message),
            NotificationKind::Negative => tracing::warn!("{}", notification.message),
        }
    }
}

#[derive(Debug, Default)]
pub struct BusyFlag {
    busy: AtomicBool,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

impl BusyIndicator for BusyFlag {
    fn show(&self) {
        self.busy.store(true, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
