//! Process-wide notification center
//!
//! An ordered queue of toast and modal notifications. Each notification is
//! displayed on enqueue and goes through exactly one terminal transition
//! (acknowledge, confirm, or cancel) that removes it and fires its callback
//! once. There is no priority or coalescing; duplicates simply queue up.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use tracing::debug;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Danger,
}

/// Where a toast is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastPosition {
    #[default]
    TopRight,
    TopMid,
    BottomRight,
}

type Callback = Box<dyn FnOnce() + Send>;

/// A transient toast.
pub struct Toast {
    pub level: Level,
    pub message: String,
    pub position: ToastPosition,
    pub(crate) on_acknowledge: Option<Callback>,
}

/// A blocking modal with confirm/cancel paths.
pub struct Modal {
    pub level: Level,
    pub title: String,
    pub message: String,
    pub(crate) on_confirm: Option<Callback>,
    pub(crate) on_cancel: Option<Callback>,
}

/// One queued notification.
pub struct Notification {
    pub id: u64,
    pub created_at: SystemTime,
    pub kind: NotificationKind,
}

pub enum NotificationKind {
    Toast(Toast),
    Modal(Modal),
}

/// Read-only snapshot of a queued notification, for rendering and health
/// reporting (callbacks are not cloneable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub id: u64,
    pub level: Level,
    pub message: String,
    pub is_modal: bool,
}

/// Ordered, process-wide notification queue.
///
/// Constructed once at application start and passed down explicitly; it is
/// not an ambient global.
#[derive(Default)]
pub struct NotificationCenter {
    next_id: AtomicU64,
    entries: Mutex<VecDeque<Notification>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a toast with default position and no callback.
    pub fn toast(&self, level: Level, message: impl Into<String>) -> u64 {
        self.toast_with(level, message, ToastPosition::default(), None)
    }

    /// Enqueue a toast with explicit position and acknowledge callback.
    pub fn toast_with(
        &self,
        level: Level,
        message: impl Into<String>,
        position: ToastPosition,
        on_acknowledge: Option<Callback>,
    ) -> u64 {
        self.push(NotificationKind::Toast(Toast {
            level,
            message: message.into(),
            position,
            on_acknowledge,
        }))
    }

    /// Enqueue a modal.
    pub fn modal(
        &self,
        level: Level,
        title: impl Into<String>,
        message: impl Into<String>,
        on_confirm: Option<Callback>,
        on_cancel: Option<Callback>,
    ) -> u64 {
        self.push(NotificationKind::Modal(Modal {
            level,
            title: title.into(),
            message: message.into(),
            on_confirm,
            on_cancel,
        }))
    }

    /// Shorthand for an info toast.
    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.toast(Level::Info, message)
    }

    /// Shorthand for a success toast.
    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.toast(Level::Success, message)
    }

    /// Shorthand for a warning toast.
    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.toast(Level::Warning, message)
    }

    /// Shorthand for a danger toast.
    pub fn danger(&self, message: impl Into<String>) -> u64 {
        self.toast(Level::Danger, message)
    }

    fn push(&self, kind: NotificationKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut entries = self.lock();
        entries.push_back(Notification {
            id,
            created_at: SystemTime::now(),
            kind,
        });
        debug!(id, queued = entries.len(), "notification enqueued");
        id
    }

    /// Acknowledge a toast: removes it and fires its callback once.
    /// Returns false if the id is not queued or refers to a modal.
    pub fn acknowledge(&self, id: u64) -> bool {
        let Some(notification) = self.take_if(id, false) else {
            return false;
        };
        if let NotificationKind::Toast(toast) = notification.kind {
            if let Some(callback) = toast.on_acknowledge {
                callback();
            }
        }
        true
    }

    /// Confirm a modal: removes it and fires `on_confirm` once.
    /// Returns false if the id is not queued or refers to a toast.
    pub fn confirm(&self, id: u64) -> bool {
        let Some(notification) = self.take_if(id, true) else {
            return false;
        };
        if let NotificationKind::Modal(modal) = notification.kind {
            if let Some(callback) = modal.on_confirm {
                callback();
            }
        }
        true
    }

    /// Cancel a modal: removes it and fires `on_cancel` once.
    /// Returns false if the id is not queued or refers to a toast.
    pub fn cancel(&self, id: u64) -> bool {
        let Some(notification) = self.take_if(id, true) else {
            return false;
        };
        if let NotificationKind::Modal(modal) = notification.kind {
            if let Some(callback) = modal.on_cancel {
                callback();
            }
        }
        true
    }

    /// Remove programmatically without firing any callback.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut entries = self.lock();
        let index = entries.iter().position(|n| n.id == id);
        match index {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Snapshot of all queued notifications in display (FIFO) order.
    pub fn snapshot(&self) -> Vec<NotificationView> {
        self.lock()
            .iter()
            .map(|n| match &n.kind {
                NotificationKind::Toast(t) => NotificationView {
                    id: n.id,
                    level: t.level,
                    message: t.message.clone(),
                    is_modal: false,
                },
                NotificationKind::Modal(m) => NotificationView {
                    id: n.id,
                    level: m.level,
                    message: m.message.clone(),
                    is_modal: true,
                },
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return a queued notification, but only when its kind
    /// matches the requested terminal transition; a modal can only leave the
    /// queue via confirm/cancel/dismiss and a toast via acknowledge/dismiss.
    /// The transition's callback fires outside the lock so it may enqueue new
    /// notifications.
    fn take_if(&self, id: u64, want_modal: bool) -> Option<Notification> {
        let mut entries = self.lock();
        let index = entries.iter().position(|n| n.id == id)?;
        let is_modal = matches!(entries[index].kind, NotificationKind::Modal(_));
        if is_modal != want_modal {
            return None;
        }
        entries.remove(index)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Notification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_acknowledge_removes_entry_and_fires_callback_once() {
        let center = NotificationCenter::new();
        let acked = Arc::new(AtomicUsize::new(0));
        let acked_in_cb = Arc::clone(&acked);

        let other = center.info("unrelated");
        let id = center.toast_with(
            Level::Success,
            "deposit confirmed",
            ToastPosition::TopRight,
            Some(Box::new(move || {
                acked_in_cb.fetch_add(1, Ordering::SeqCst);
            })),
        );

        assert_eq!(center.len(), 2);
        assert!(center.acknowledge(id));
        assert_eq!(acked.load(Ordering::SeqCst), 1);
        assert_eq!(center.len(), 1);
        assert_eq!(center.snapshot()[0].id, other);

        // Second acknowledge is a no-op; the callback never refires
        assert!(!center.acknowledge(id));
        assert_eq!(acked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_modal_confirm_and_cancel_are_exclusive() {
        let center = NotificationCenter::new();
        let confirmed = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&confirmed);
        let c2 = Arc::clone(&cancelled);

        let id = center.modal(
            Level::Warning,
            "Switch chain",
            "Continue?",
            Some(Box::new(move || {
                c1.fetch_add(1, Ordering::SeqCst);
            })),
            Some(Box::new(move || {
                c2.fetch_add(1, Ordering::SeqCst);
            })),
        );

        assert!(center.confirm(id));
        assert!(!center.cancel(id));
        assert_eq!(confirmed.load(Ordering::SeqCst), 1);
        assert_eq!(cancelled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fifo_order_and_duplicates() {
        let center = NotificationCenter::new();
        center.warning("low balance");
        center.warning("low balance");
        center.danger("transfer failed");

        let views = center.snapshot();
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].message, "low balance");
        assert_eq!(views[1].message, "low balance");
        assert_ne!(views[0].id, views[1].id);
        assert_eq!(views[2].level, Level::Danger);
    }

    #[test]
    fn test_kind_mismatched_transition_leaves_entry_queued() {
        let center = NotificationCenter::new();
        let confirmed = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&confirmed);

        let modal_id = center.modal(
            Level::Danger,
            "Disconnect",
            "Really?",
            Some(Box::new(move || {
                c1.fetch_add(1, Ordering::SeqCst);
            })),
            None,
        );
        let toast_id = center.info("connected");

        // Acknowledging a modal or confirming/cancelling a toast is not a
        // valid terminal transition; the entry stays queued, callbacks intact
        assert!(!center.acknowledge(modal_id));
        assert!(!center.confirm(toast_id));
        assert!(!center.cancel(toast_id));
        assert_eq!(center.len(), 2);

        assert!(center.confirm(modal_id));
        assert_eq!(confirmed.load(Ordering::SeqCst), 1);
        assert!(center.acknowledge(toast_id));
        assert!(center.is_empty());
    }

    #[test]
    fn test_dismiss_skips_callback() {
        let center = NotificationCenter::new();
        let acked = Arc::new(AtomicUsize::new(0));
        let acked_in_cb = Arc::clone(&acked);

        let id = center.toast_with(
            Level::Info,
            "bye",
            ToastPosition::BottomRight,
            Some(Box::new(move || {
                acked_in_cb.fetch_add(1, Ordering::SeqCst);
            })),
        );

        assert!(center.dismiss(id));
        assert_eq!(acked.load(Ordering::SeqCst), 0);
        assert!(center.is_empty());
    }
}
