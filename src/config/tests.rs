//! Tests for config functionality.

use crate::config::{CONFIG_ENV_VAR, Config};
use crate::locks::Scope;
use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.poll_interval_ms, 200);
    assert_eq!(config.default_timeout_ms, 1000);
    assert_eq!(config.default_scope, Scope::Global);
    assert_eq!(config.lock_stale_minutes, 120);
    assert_eq!(config.worker_name_prefix, "handoff-worker");
    assert!(config.lock_dir.ends_with("handoff-locks"));
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    // Should use all defaults
    assert_eq!(config.poll_interval_ms, 200);
    assert_eq!(config.default_scope, Scope::Global);
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
poll_interval_ms: 50
default_scope: local
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.poll_interval_ms, 50);
    assert_eq!(config.default_scope, Scope::Local);

    // Unspecified values should use defaults
    assert_eq!(config.default_timeout_ms, 1000);
    assert_eq!(config.lock_stale_minutes, 120);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
poll_interval_ms: 25
default_timeout_ms: 5000
lock_dir: /var/tmp/my-locks
default_scope: global
lock_stale_minutes: 30
worker_name_prefix: bg
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.poll_interval(), Duration::from_millis(25));
    assert_eq!(config.default_timeout(), Duration::from_secs(5));
    assert_eq!(config.lock_dir, PathBuf::from("/var/tmp/my-locks"));
    assert_eq!(config.lock_stale_minutes, 30);
    assert_eq!(config.worker_name_prefix, "bg");
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
poll_interval_ms: 10
future_option: true
nested:
  key: value
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.poll_interval_ms, 10);
}

#[test]
fn test_zero_poll_interval_is_rejected() {
    let err = Config::from_yaml("poll_interval_ms: 0").unwrap_err();
    assert!(err.to_string().contains("poll_interval_ms"));
}

#[test]
fn test_zero_stale_minutes_is_rejected() {
    let err = Config::from_yaml("lock_stale_minutes: 0").unwrap_err();
    assert!(err.to_string().contains("lock_stale_minutes"));
}

#[test]
fn test_blank_worker_prefix_is_rejected() {
    let err = Config::from_yaml("worker_name_prefix: '  '").unwrap_err();
    assert!(err.to_string().contains("worker_name_prefix"));
}

#[test]
fn test_invalid_scope_fails_to_parse() {
    let err = Config::from_yaml("default_scope: session").unwrap_err();
    assert!(err.to_string().contains("failed to parse config YAML"));
}

#[test]
fn test_yaml_round_trip_preserves_values() {
    let mut config = Config::default();
    config.poll_interval_ms = 75;
    config.default_scope = Scope::Local;

    let yaml = config.to_yaml().unwrap();
    let parsed = Config::from_yaml(&yaml).unwrap();

    assert_eq!(parsed.poll_interval_ms, 75);
    assert_eq!(parsed.default_scope, Scope::Local);
}

#[test]
fn test_load_missing_file_is_user_error() {
    let temp = TempDir::new().unwrap();
    let err = Config::load(temp.path().join("nope.yaml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
#[serial]
fn test_discover_prefers_explicit_path() {
    let temp = TempDir::new().unwrap();
    let explicit = temp.path().join("explicit.yaml");
    std::fs::write(&explicit, "poll_interval_ms: 11\n").unwrap();

    let config = Config::discover(Some(&explicit)).unwrap();
    assert_eq!(config.poll_interval_ms, 11);
}

#[test]
#[serial]
fn test_discover_reads_env_var() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("env.yaml");
    std::fs::write(&path, "poll_interval_ms: 33\n").unwrap();

    // SAFETY: serialized with every other test that touches the environment.
    unsafe { std::env::set_var(CONFIG_ENV_VAR, &path) };
    let config = Config::discover(None);
    unsafe { std::env::remove_var(CONFIG_ENV_VAR) };

    assert_eq!(config.unwrap().poll_interval_ms, 33);
}

#[test]
#[serial]
fn test_discover_falls_back_to_defaults() {
    unsafe { std::env::remove_var(CONFIG_ENV_VAR) };
    let config = Config::discover(None).unwrap();
    assert_eq!(config.poll_interval_ms, 200);
}
