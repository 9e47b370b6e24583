// tests/cli_dispatch_test.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

// 辅助函数：隔离主目录，避免读写真实的配置和日志
fn main_command(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("CANVAS_API_KEY");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("settings"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_api_key_help() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .args(["settings", "api-key-help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Approved Integrations"));
}

#[test]
fn test_settings_show_creates_default_config() {
    let home = tempdir().unwrap();
    let config = home.path().join("custom").join("config.json");
    main_command(home.path())
        .arg("--config")
        .arg(&config)
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Canvas URL"))
        .stdout(predicate::str::contains("Course ID number(s)"));
    assert!(config.is_file());
}

#[test]
fn test_settings_set_writes_normalized_value() {
    let home = tempdir().unwrap();
    let config = home.path().join("config.json");
    main_command(home.path())
        .arg("--config")
        .arg(&config)
        .args(["settings", "set", "url", "canvas.example.edu/"])
        .assert()
        .success();
    main_command(home.path())
        .arg("--config")
        .arg(&config)
        .args(["settings", "set", "course-ids", "12, 34"])
        .assert()
        .success();

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config).unwrap()).unwrap();
    assert_eq!(saved["url"], "https://canvas.example.edu");
    assert_eq!(saved["course_ids"], serde_json::json!([12, 34]));
}

#[test]
fn test_settings_set_rejects_invalid_value() {
    let home = tempdir().unwrap();
    let config = home.path().join("config.json");
    main_command(home.path())
        .arg("--config")
        .arg(&config)
        .args(["settings", "set", "api-key", "not-a-key"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn test_sync_with_incomplete_config_points_to_settings() {
    let home = tempdir().unwrap();
    let config = home.path().join("config.json");
    main_command(home.path())
        .arg("--config")
        .arg(&config)
        .arg("sync")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cansync settings"));
}

#[test]
fn test_default_command_is_sync() {
    let home = tempdir().unwrap();
    let config = home.path().join("config.json");
    main_command(home.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("配置无效"));
}

#[test]
fn test_unknown_settings_key_is_rejected_by_parser() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .args(["settings", "set", "password", "x"])
        .assert()
        .failure()
        .code(2);
}
