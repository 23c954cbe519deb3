//! Terminal presentation: event rendering and the notification sink.

use std::io::{IsTerminal, Write};

use search_core::{
    Notification, NotificationSink, Permission, PermissionSource, SearchEvent, SearchSnapshot,
};
use shared::domain::Slot;

/// Granted only while stderr is attached to a terminal; asked again on every notify.
pub struct TerminalPermission;

impl PermissionSource for TerminalPermission {
    fn permission(&self) -> Permission {
        if std::io::stderr().is_terminal() {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }
}

#[derive(Default)]
pub struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn show(&self, notification: Notification) {
        let mut stderr = std::io::stderr().lock();
        // BEL so the terminal can raise its own alert.
        let _ = writeln!(
            stderr,
            "\x07[{}] {} {}",
            notification.tag, notification.title, notification.body
        );
    }
}

pub fn format_slot(slot: &Slot) -> String {
    let start = slot
        .start_time()
        .map(|t| t.format("%a %b %e %Y %H:%M").to_string())
        .unwrap_or_else(|| slot.start_timestamp.clone());
    let remote = if slot.remote_ind { " (remote)" } else { "" };
    format!("{start} - {} min{remote}", slot.duration)
}

pub fn render_slots(slots: &[Slot], snapshot: &SearchSnapshot) -> Vec<String> {
    if slots.is_empty() {
        return vec![format!(
            "No appointments available (last searched {})",
            snapshot.last_search_label()
        )];
    }
    let mut lines = Vec::with_capacity(slots.len() + 1);
    lines.push(format!(
        "{} appointment(s) available (last searched {}):",
        slots.len(),
        snapshot.last_search_label()
    ));
    lines.extend(slots.iter().map(|slot| format!("  {}", format_slot(slot))));
    lines
}

pub fn render_event(event: &SearchEvent, snapshot: &SearchSnapshot) -> Vec<String> {
    match event {
        SearchEvent::AttemptStarted { location_id, .. } => {
            vec![format!("Searching location {location_id}...")]
        }
        SearchEvent::SlotsUpdated { slots, .. } => render_slots(slots, snapshot),
        SearchEvent::FetchFailed { message, .. } => vec![format!("Error: {message}")],
        SearchEvent::RetryScheduled { delay } => {
            vec![format!("Next search in {}s", delay.as_secs())]
        }
        SearchEvent::RetryCancelled => vec!["Scheduled search cancelled".to_string()],
    }
}
