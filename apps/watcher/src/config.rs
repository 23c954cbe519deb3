use std::{fs, path::Path, time::Duration};

use search_core::{MessageCatalog, DEFAULT_RETRY_DELAY};
use serde::Deserialize;
use shared::{domain::LocationId, protocol::DEFAULT_SCHEDULER_URL};
use tracing::warn;

pub const SETTINGS_FILE: &str = "watcher.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub scheduler_url: String,
    pub location_id: i64,
    pub retry_delay_seconds: u64,
    pub auto_retry: bool,
    pub notifications: bool,
    pub messages: Option<MessageCatalog>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheduler_url: DEFAULT_SCHEDULER_URL.into(),
            location_id: LocationId::DEFAULT.0,
            retry_delay_seconds: DEFAULT_RETRY_DELAY.as_secs(),
            auto_retry: true,
            notifications: false,
            messages: None,
        }
    }
}

impl Settings {
    pub fn location_id(&self) -> LocationId {
        LocationId(self.location_id)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds.max(1))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    scheduler_url: Option<String>,
    location_id: Option<i64>,
    retry_delay_seconds: Option<u64>,
    auto_retry: Option<bool>,
    notifications: Option<bool>,
    messages: Option<MessageCatalog>,
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the toml file at `path`, then `APP__*` variables from `env`.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, file_cfg),
            Err(err) => warn!(
                path = %path.display(),
                "config: ignoring unreadable settings file: {err}"
            ),
        }
    }

    if let Some(v) = env("APP__SCHEDULER_URL") {
        settings.scheduler_url = v;
    }
    if let Some(v) = env("APP__LOCATION_ID") {
        if let Ok(parsed) = v.trim().parse::<i64>() {
            settings.location_id = parsed;
        }
    }
    if let Some(v) = env("APP__RETRY_DELAY_SECONDS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.retry_delay_seconds = parsed;
        }
    }
    if let Some(v) = env("APP__AUTO_RETRY") {
        if let Some(parsed) = parse_flag(&v) {
            settings.auto_retry = parsed;
        }
    }
    if let Some(v) = env("APP__NOTIFICATIONS") {
        if let Some(parsed) = parse_flag(&v) {
            settings.notifications = parsed;
        }
    }

    settings
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.scheduler_url {
        settings.scheduler_url = v;
    }
    if let Some(v) = file_cfg.location_id {
        settings.location_id = v;
    }
    if let Some(v) = file_cfg.retry_delay_seconds {
        settings.retry_delay_seconds = v;
    }
    if let Some(v) = file_cfg.auto_retry {
        settings.auto_retry = v;
    }
    if let Some(v) = file_cfg.notifications {
        settings.notifications = v;
    }
    if file_cfg.messages.is_some() {
        settings.messages = file_cfg.messages;
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
