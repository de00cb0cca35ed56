//! Configuration loader tests
//!
//! Tests that mutate environment variables are ignored by default:
//!
//! ```bash
//! cargo test -p svcg-infrastructure --test unit config -- --test-threads=1 --ignored
//! ```

use std::env;
use std::io::Write;

use svcg_domain::Error;
use svcg_infrastructure::config::{
    ConfigLoader, DisposalOrder, LoggingConfig, RuntimeConfig, to_toml,
};

/// Helper to set env var
fn set_env(key: &str, value: &str) {
    // SAFETY: Tests must run with --test-threads=1
    unsafe {
        env::set_var(key, value);
    }
}

/// Helper to remove env var
fn remove_env(key: &str) {
    // SAFETY: Tests must run with --test-threads=1
    unsafe {
        env::remove_var(key);
    }
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_defaults() {
    let config = RuntimeConfig::default();
    assert_eq!(config.logging.level, "info");
    assert!(!config.logging.json_format);
    assert_eq!(config.disposal.order, DisposalOrder::Reverse);
    assert_eq!(config.disposal.hook_timeout_ms, 30_000);
}

#[test]
fn test_explicit_file_overrides_defaults() {
    let file = write_config(
        r#"
[logging]
level = "debug"

[disposal]
order = "registration"
"#,
    );

    let config = ConfigLoader::new()
        .with_config_path(file.path())
        .load()
        .expect("load");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.disposal.order, DisposalOrder::Registration);
    // Untouched keys keep their defaults
    assert_eq!(config.disposal.hook_timeout_ms, 30_000);
}

#[test]
fn test_load_without_explicit_file() {
    let loader = ConfigLoader::new();
    assert!(loader.config_path().is_none());
    loader.load().expect("defaults load");
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let err = ConfigLoader::new()
        .with_config_path("/definitely/not/here/svcg.toml")
        .load()
        .expect_err("missing file");
    assert!(matches!(err, Error::Configuration { .. }));
}

#[test]
fn test_invalid_log_level_is_rejected() {
    let file = write_config("[logging]\nlevel = \"loud\"\n");
    let err = ConfigLoader::new()
        .with_config_path(file.path())
        .load()
        .expect_err("invalid level");
    assert!(err.to_string().contains("Invalid log level"));
}

#[test]
fn test_save_and_reload() {
    let config = RuntimeConfig {
        logging: LoggingConfig {
            level: "warn".to_string(),
            json_format: true,
            file_output: None,
        },
        ..RuntimeConfig::default()
    };
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("svcg.toml");

    let loader = ConfigLoader::new().with_config_path(&path);
    loader.save_to_file(&config, &path).expect("save");
    let reloaded = loader.load().expect("reload");
    assert_eq!(reloaded, config);
}

#[test]
fn test_to_toml_renders_sections() {
    let rendered = to_toml(&RuntimeConfig::default()).expect("render");
    assert!(rendered.contains("[logging]"));
    assert!(rendered.contains("[disposal]"));
    assert!(rendered.contains("order = \"reverse\""));
}

#[test]
#[ignore = "requires --test-threads=1 due to env var mutations"]
fn test_env_overrides_file() {
    let file = write_config("[logging]\nlevel = \"debug\"\n");
    set_env("SVCG__LOGGING__LEVEL", "error");
    set_env("SVCG__DISPOSAL__HOOK_TIMEOUT_MS", "5");

    let config = ConfigLoader::new()
        .with_config_path(file.path())
        .load()
        .expect("load");

    remove_env("SVCG__LOGGING__LEVEL");
    remove_env("SVCG__DISPOSAL__HOOK_TIMEOUT_MS");
    assert_eq!(config.logging.level, "error");
    assert_eq!(config.disposal.hook_timeout_ms, 5);
}

#[test]
#[ignore = "requires --test-threads=1 due to env var mutations"]
fn test_single_underscore_prefix_is_ignored() {
    set_env("SVCG_LOGGING__LEVEL", "trace");
    let file = write_config("");

    let config = ConfigLoader::new()
        .with_config_path(file.path())
        .load()
        .expect("load");

    remove_env("SVCG_LOGGING__LEVEL");
    assert_eq!(config.logging.level, "info");
}
