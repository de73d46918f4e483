//! Integration tests for configuration loading and key resolution
//!
//! Uses serial_test to prevent ENV variable race conditions: tests that touch
//! MRP_CONFIG or MRP_*_API_KEY are marked #[serial].

use mrp_common::config::{
    load_config, load_toml_config, resolve_config_path, write_toml_config, ApiKeys, TomlConfig,
    CONFIG_ENV_VAR,
};
use mrp_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_write_then_load_preserves_settings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("mrp.toml");

    let mut config = TomlConfig::default();
    config.sources.image = vec!["unsplash".to_string()];
    config.sources.priority.insert("unsplash".to_string(), 0);
    config.phrase.video_prefix = "cinematic".to_string();
    config.api_keys.pexels = Some("pexels-key".to_string());
    config.resolver.discard_stale_results = true;

    write_toml_config(&config, &path).unwrap();
    let loaded = load_toml_config(&path).unwrap();

    assert_eq!(loaded, config);
    assert!(!path.with_extension("toml.tmp").exists(), "temp file must be renamed away");
}

#[test]
fn test_write_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("dir").join("mrp.toml");

    write_toml_config(&TomlConfig::default(), &path).unwrap();
    assert!(path.exists());
}

#[test]
fn test_invalid_toml_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("mrp.toml");
    std::fs::write(&path, "[sources\nper_page = ").unwrap();

    let result = load_toml_config(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_out_of_range_value_is_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("mrp.toml");
    std::fs::write(&path, "[sources]\nper_page = 500\n").unwrap();

    assert!(load_toml_config(&path).is_err());
}

#[test]
fn test_empty_source_list_is_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("mrp.toml");
    std::fs::write(&path, "[sources]\nvideo = []\n").unwrap();

    assert!(matches!(load_toml_config(&path), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_argument_wins_over_environment() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let cli = PathBuf::from("/from/cli.toml");

    let resolved = resolve_config_path(Some(&cli));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(cli));
}

#[test]
#[serial]
fn test_environment_used_without_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let resolved = resolve_config_path(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/from/env.toml")));
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("absent.toml");

    let config = load_config(Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_api_key_environment_wins_over_toml() {
    let keys = ApiKeys {
        pexels: Some("toml-key".to_string()),
        ..Default::default()
    };

    env::set_var("MRP_PEXELS_API_KEY", "env-key");
    let resolved = keys.resolve("pexels");
    env::remove_var("MRP_PEXELS_API_KEY");

    assert_eq!(resolved.as_deref(), Some("env-key"));
}

#[test]
#[serial]
fn test_blank_api_keys_count_as_absent() {
    let keys = ApiKeys {
        groq: Some("   ".to_string()),
        ..Default::default()
    };

    env::set_var("MRP_GROQ_API_KEY", "");
    let resolved = keys.resolve("groq");
    env::remove_var("MRP_GROQ_API_KEY");

    assert_eq!(resolved, None);
}

#[test]
#[serial]
fn test_toml_key_used_when_environment_unset() {
    env::remove_var("MRP_GEMINI_API_KEY");
    let keys = ApiKeys {
        gemini: Some("gemini-key".to_string()),
        ..Default::default()
    };
    assert_eq!(keys.resolve("gemini").as_deref(), Some("gemini-key"));
}
