use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc, Mutex,
};

use super::*;
use shared::domain::LocationId;

#[derive(Clone, Default)]
struct RecordingSink {
    shown: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationSink for RecordingSink {
    fn show(&self, notification: Notification) {
        self.shown.lock().expect("sink").push(notification);
    }
}

/// Permission that can be flipped after the notifier is built.
#[derive(Clone)]
struct SwitchablePermission(Arc<AtomicU8>);

impl SwitchablePermission {
    fn new(permission: Permission) -> Self {
        let switch = Self(Arc::new(AtomicU8::new(0)));
        switch.set(permission);
        switch
    }

    fn set(&self, permission: Permission) {
        let raw = match permission {
            Permission::Granted => 0,
            Permission::Denied => 1,
            Permission::Default => 2,
        };
        self.0.store(raw, Ordering::SeqCst);
    }
}

impl PermissionSource for SwitchablePermission {
    fn permission(&self) -> Permission {
        match self.0.load(Ordering::SeqCst) {
            0 => Permission::Granted,
            1 => Permission::Denied,
            _ => Permission::Default,
        }
    }
}

fn slot(start: &str) -> Slot {
    Slot {
        location_id: LocationId(5446),
        start_timestamp: start.to_string(),
        end_timestamp: "2024-01-15T10:45".to_string(),
        active: true,
        duration: 15,
        remote_ind: false,
    }
}

#[test]
fn single_slot_uses_singular_phrasing() {
    let sink = RecordingSink::default();
    let notifier = SystemNotifier::new(
        SwitchablePermission::new(Permission::Granted),
        sink.clone(),
    );

    notifier.notify(&[slot("2024-01-15T10:30")]);

    let shown = sink.shown.lock().expect("sink");
    assert_eq!(
        *shown,
        vec![Notification {
            title: "Appointment available!".to_string(),
            body: "1 appointment is available".to_string(),
            tag: NOTIFICATION_TAG.to_string(),
        }]
    );
}

#[test]
fn multiple_slots_use_plural_phrasing() {
    let sink = RecordingSink::default();
    let notifier = SystemNotifier::new(
        SwitchablePermission::new(Permission::Granted),
        sink.clone(),
    );

    notifier.notify(&[slot("2024-01-15T10:30"), slot("2024-01-16T11:00")]);

    let shown = sink.shown.lock().expect("sink");
    assert_eq!(shown[0].title, "Appointments available!");
    assert_eq!(shown[0].body, "2 appointments are available");
    assert_eq!(shown[0].tag, "geas-new-appointment-available");
}

#[test]
fn denied_or_undecided_permission_shows_nothing() {
    for permission in [Permission::Denied, Permission::Default] {
        let sink = RecordingSink::default();
        let notifier = SystemNotifier::new(SwitchablePermission::new(permission), sink.clone());

        notifier.notify(&[slot("2024-01-15T10:30")]);

        assert!(sink.shown.lock().expect("sink").is_empty(), "{permission:?}");
    }
}

#[test]
fn permission_is_queried_on_every_notify() {
    let sink = RecordingSink::default();
    let permission = SwitchablePermission::new(Permission::Denied);
    let notifier = SystemNotifier::new(permission.clone(), sink.clone());

    notifier.notify(&[slot("2024-01-15T10:30")]);
    permission.set(Permission::Granted);
    notifier.notify(&[slot("2024-01-15T10:30")]);
    permission.set(Permission::Denied);
    notifier.notify(&[slot("2024-01-15T10:30")]);

    assert_eq!(sink.shown.lock().expect("sink").len(), 1);
}

#[test]
fn catalog_zero_variant_and_custom_strings() {
    assert_eq!(
        MessageCatalog::default().build(0).title,
        "No appointments available"
    );

    let catalog: MessageCatalog = serde_json::from_value(serde_json::json!({
        "title": { "zero": "Keine Termine", "one": "Termin frei!", "other": "Termine frei!" },
        "body": { "zero": "-", "one": "{{count}} Termin", "other": "{{count}} Termine" }
    }))
    .expect("catalog");
    let notification = catalog.build(3);
    assert_eq!(notification.title, "Termine frei!");
    assert_eq!(notification.body, "3 Termine");
    assert_eq!(notification.tag, NOTIFICATION_TAG);
}
