//! Line commands typed by the user, mapped onto controller intents.

use std::sync::Arc;

use search_core::SearchController;
use shared::domain::LocationId;
use thiserror::Error;
use tracing::debug;

pub const HELP_TEXT: &str = "commands: s|search, a|auto (toggle auto-retry), n|notify (toggle notifications), l|location <id>, status, q|quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Search,
    ToggleAutoRetry,
    ToggleNotifications,
    ChangeLocation(LocationId),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("location needs a numeric id, got '{0}'")]
    InvalidLocation(String),
}

pub fn parse_command(line: &str) -> Result<UserCommand, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Err(CommandError::Empty);
    };

    match head.to_ascii_lowercase().as_str() {
        "s" | "search" => Ok(UserCommand::Search),
        "a" | "auto" => Ok(UserCommand::ToggleAutoRetry),
        "n" | "notify" => Ok(UserCommand::ToggleNotifications),
        "status" => Ok(UserCommand::Status),
        "h" | "help" | "?" => Ok(UserCommand::Help),
        "q" | "quit" | "exit" => Ok(UserCommand::Quit),
        "l" | "location" => {
            let raw = parts.next().unwrap_or_default();
            raw.parse::<i64>()
                .map(|id| UserCommand::ChangeLocation(LocationId(id)))
                .map_err(|_| CommandError::InvalidLocation(raw.to_string()))
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Applies one command and returns a status line for the user.
pub fn dispatch(controller: &Arc<SearchController>, command: UserCommand) -> (Flow, String) {
    debug!(?command, "ui: dispatching command");
    match command {
        UserCommand::Search => {
            controller.start_search();
            (Flow::Continue, "Searching...".to_string())
        }
        UserCommand::ToggleAutoRetry => {
            let enabled = !controller.snapshot().should_auto_retry;
            controller.set_should_auto_retry(enabled);
            controller.change_auto_retry();
            (Flow::Continue, format!("auto-retry {}", on_off(enabled)))
        }
        UserCommand::ToggleNotifications => {
            let enabled = !controller.snapshot().notifications_enabled;
            controller.set_notifications_enabled(enabled);
            (Flow::Continue, format!("notifications {}", on_off(enabled)))
        }
        UserCommand::ChangeLocation(location_id) => {
            controller.set_location_id(location_id);
            (
                Flow::Continue,
                format!("location set to {location_id}; applies to the next search"),
            )
        }
        UserCommand::Status => {
            let snapshot = controller.snapshot();
            (
                Flow::Continue,
                format!(
                    "location {} | auto-retry {} | notifications {} | last searched {} | {}",
                    snapshot.location_id,
                    on_off(snapshot.should_auto_retry),
                    on_off(snapshot.notifications_enabled),
                    snapshot.last_search_label(),
                    snapshot.search_button_label(),
                ),
            )
        }
        UserCommand::Help => (Flow::Continue, HELP_TEXT.to_string()),
        UserCommand::Quit => (Flow::Quit, "bye".to_string()),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
