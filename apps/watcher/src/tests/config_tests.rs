use super::{load_settings_from, parse_flag, Settings};

use std::{
    collections::HashMap,
    env, fs,
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

fn temp_settings_file(name: &str, contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("watcher_config_test_{name}_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("watcher.toml");
    fs::write(&path, contents).expect("write settings");
    path
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn missing_file_and_env_yield_defaults() {
    let settings = load_settings_from(&env::temp_dir().join("does-not-exist.toml"), env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.location_id, 5446);
    assert_eq!(settings.retry_delay(), Duration::from_secs(60));
    assert!(settings.auto_retry);
    assert!(!settings.notifications);
}

#[test]
fn file_values_override_defaults() {
    let path = temp_settings_file(
        "file",
        r#"
scheduler_url = "http://127.0.0.1:9000/slots"
location_id = 9140
retry_delay_seconds = 120
auto_retry = false
notifications = true

[messages.title]
zero = "Keine Termine"
one = "Termin frei!"
other = "Termine frei!"

[messages.body]
zero = "-"
one = "{{count}} Termin"
other = "{{count}} Termine"
"#,
    );

    let settings = load_settings_from(&path, env_from(&[]));
    assert_eq!(settings.scheduler_url, "http://127.0.0.1:9000/slots");
    assert_eq!(settings.location_id, 9140);
    assert_eq!(settings.retry_delay(), Duration::from_secs(120));
    assert!(!settings.auto_retry);
    assert!(settings.notifications);
    let catalog = settings.messages.expect("messages");
    assert_eq!(catalog.build(2).body, "2 Termine");

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn env_overrides_file_and_ignores_garbage() {
    let path = temp_settings_file("env", "location_id = 9140\nretry_delay_seconds = 30\n");

    let settings = load_settings_from(
        &path,
        env_from(&[
            ("APP__LOCATION_ID", "5140"),
            ("APP__RETRY_DELAY_SECONDS", "soon"),
            ("APP__AUTO_RETRY", "off"),
            ("APP__NOTIFICATIONS", "maybe"),
        ]),
    );
    assert_eq!(settings.location_id, 5140);
    assert_eq!(settings.retry_delay_seconds, 30);
    assert!(!settings.auto_retry);
    assert!(!settings.notifications);

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn unreadable_file_falls_back_to_defaults() {
    let path = temp_settings_file("broken", "location_id = [not toml");
    let settings = load_settings_from(&path, env_from(&[]));
    assert_eq!(settings, Settings::default());
    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn zero_delay_is_clamped() {
    let settings = Settings {
        retry_delay_seconds: 0,
        ..Settings::default()
    };
    assert_eq!(settings.retry_delay(), Duration::from_secs(1));
}

#[test]
fn parses_common_flag_spellings() {
    assert_eq!(parse_flag("TRUE"), Some(true));
    assert_eq!(parse_flag(" 0 "), Some(false));
    assert_eq!(parse_flag("yes"), Some(true));
    assert_eq!(parse_flag("sometimes"), None);
}
