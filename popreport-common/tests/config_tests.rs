//! Tests for configuration resolution and graceful degradation
//!
//! Uses serial_test to prevent environment variable races: every test that
//! touches POPREPORT_* variables is marked #[serial].

use popreport_common::config::{
    CliOverrides, CompiledDefaults, ConfigResolver, ENV_ACCESS_PASSWORD, ENV_BIND,
    ENV_ROOT_FOLDER, ENV_STATIC_DIR,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ENV_ROOT_FOLDER);
    env::remove_var(ENV_BIND);
    env::remove_var(ENV_ACCESS_PASSWORD);
    env::remove_var(ENV_STATIC_DIR);
}

fn write_toml(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_defaults_when_nothing_configured() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::with_toml_path(dir.path().join("missing.toml"));

    let config = resolver.resolve(&CliOverrides::default());
    let defaults = CompiledDefaults::for_current_platform();

    assert_eq!(config.root_folder, defaults.root_folder);
    assert_eq!(config.bind, "127.0.0.1:5730");
    assert_eq!(config.log_level, "info");
    assert!(config.access_password.is_none());
    assert!(config.static_assets.is_none());
}

#[test]
#[serial]
fn test_toml_values_used_when_no_env_or_cli() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_toml(
        &dir,
        r#"
        root_folder = "/data/popreport"
        bind = "0.0.0.0:9000"
        access_password = "letmein"

        [logging]
        level = "debug"
        "#,
    );

    let config = ConfigResolver::with_toml_path(path).resolve(&CliOverrides::default());

    assert_eq!(config.root_folder, PathBuf::from("/data/popreport"));
    assert_eq!(config.bind, "0.0.0.0:9000");
    assert_eq!(config.access_password.as_deref(), Some("letmein"));
    assert_eq!(config.log_level, "debug");
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_toml(&dir, "root_folder = \"/from/toml\"\naccess_password = \"toml\"");

    env::set_var(ENV_ROOT_FOLDER, "/from/env");
    env::set_var(ENV_ACCESS_PASSWORD, "env-secret");

    let config = ConfigResolver::with_toml_path(path).resolve(&CliOverrides::default());
    clear_env();

    assert_eq!(config.root_folder, PathBuf::from("/from/env"));
    assert_eq!(config.access_password.as_deref(), Some("env-secret"));
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    env::set_var(ENV_BIND, "10.0.0.1:80");

    let dir = TempDir::new().unwrap();
    let cli = CliOverrides {
        bind: Some("127.0.0.1:6000".to_string()),
        root_folder: Some(PathBuf::from("/from/cli")),
        static_assets: None,
    };
    let config = ConfigResolver::with_toml_path(dir.path().join("none.toml")).resolve(&cli);
    clear_env();

    assert_eq!(config.bind, "127.0.0.1:6000");
    assert_eq!(config.root_folder, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_malformed_toml_falls_back_to_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_toml(&dir, "this is = = not toml");

    let config = ConfigResolver::with_toml_path(path).resolve(&CliOverrides::default());

    assert_eq!(config.bind, "127.0.0.1:5730");
    assert_eq!(config.log_level, "info");
}

#[test]
#[serial]
fn test_blank_password_disables_gating() {
    clear_env();
    env::set_var(ENV_ACCESS_PASSWORD, "   ");

    let dir = TempDir::new().unwrap();
    let config = ConfigResolver::with_toml_path(dir.path().join("none.toml"))
        .resolve(&CliOverrides::default());
    clear_env();

    assert!(config.access_password.is_none());
}
