//! Notification building: permission gate, plural-aware catalog, stable dedup tag.

use serde::Deserialize;
use shared::domain::Slot;
use tracing::debug;

/// Repeated notifications carrying this tag replace each other instead of stacking.
pub const NOTIFICATION_TAG: &str = "geas-new-appointment-available";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Default,
}

/// Host capability query. Implementations must answer from live state on every call.
pub trait PermissionSource: Send + Sync {
    fn permission(&self) -> Permission;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: String,
}

pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: Notification);
}

pub trait Notifier: Send + Sync {
    /// Called with a non-empty slot list after a successful attempt.
    fn notify(&self, slots: &[Slot]);
}

/// Count-based variants of one message; `{{count}}` is replaced on render.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PluralForms {
    pub zero: String,
    pub one: String,
    pub other: String,
}

impl PluralForms {
    pub fn render(&self, count: usize) -> String {
        let template = match count {
            0 => &self.zero,
            1 => &self.one,
            _ => &self.other,
        };
        template.replace("{{count}}", &count.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageCatalog {
    pub title: PluralForms,
    pub body: PluralForms,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            title: PluralForms {
                zero: "No appointments available".into(),
                one: "Appointment available!".into(),
                other: "Appointments available!".into(),
            },
            body: PluralForms {
                zero: "No appointments available".into(),
                one: "{{count}} appointment is available".into(),
                other: "{{count}} appointments are available".into(),
            },
        }
    }
}

impl MessageCatalog {
    pub fn build(&self, count: usize) -> Notification {
        Notification {
            title: self.title.render(count),
            body: self.body.render(count),
            tag: NOTIFICATION_TAG.to_string(),
        }
    }
}

pub struct SystemNotifier<P, S> {
    permission: P,
    sink: S,
    catalog: MessageCatalog,
}

impl<P: PermissionSource, S: NotificationSink> SystemNotifier<P, S> {
    pub fn new(permission: P, sink: S) -> Self {
        Self::with_catalog(permission, sink, MessageCatalog::default())
    }

    pub fn with_catalog(permission: P, sink: S, catalog: MessageCatalog) -> Self {
        Self {
            permission,
            sink,
            catalog,
        }
    }
}

impl<P: PermissionSource, S: NotificationSink> Notifier for SystemNotifier<P, S> {
    fn notify(&self, slots: &[Slot]) {
        let permission = self.permission.permission();
        if permission != Permission::Granted {
            debug!(?permission, "notify: permission not granted, skipping");
            return;
        }
        self.sink.show(self.catalog.build(slots.len()));
    }
}

#[cfg(test)]
#[path = "tests/notifications_tests.rs"]
mod tests;
