//! Building the pipeline from a TOML file

use mrp_common::config::{api_key_env_var, load_toml_config};
use mrp_common::SystemClock;
use mrp_resolver::{MediaKind, Resolver};
use serial_test::serial;
use std::sync::Arc;
use tempfile::TempDir;

const KEY_NAMES: [&str; 7] = [
    "pexels",
    "pixabay",
    "unsplash",
    "giphy",
    "gemini",
    "groq",
    "openrouter",
];

fn clear_key_env() {
    for name in KEY_NAMES {
        std::env::remove_var(api_key_env_var(name));
    }
}

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("mrp.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
#[serial]
fn test_only_keyed_sources_are_built() {
    clear_key_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [api_keys]
        pexels = "pexels-key"
        giphy = "   "

        [sources]
        image = ["pexels", "openverse"]

        [sources.priority]
        openverse = 0
        "#,
    );
    let config = load_toml_config(&path).unwrap();

    let resolver = Resolver::from_config(&config, Arc::new(SystemClock));

    assert_eq!(resolver.sources().ids(), vec!["pexels", "openverse"]);
    let images = resolver.sources().enabled_for(MediaKind::Image);
    let ranks: Vec<_> = images.iter().map(|s| (s.id(), s.descriptor.priority)).collect();
    assert_eq!(ranks, vec![("pexels", 1), ("openverse", 0)]);
    assert!(resolver.optimizer().provider_names().is_empty());
}

#[test]
#[serial]
fn test_env_key_enables_provider() {
    clear_key_env();
    std::env::set_var(api_key_env_var("groq"), "groq-env-key");
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[keywords]\ngroq_daily_limit = 5\n");
    let config = load_toml_config(&path).unwrap();

    let resolver = Resolver::from_config(&config, Arc::new(SystemClock));

    assert_eq!(resolver.optimizer().provider_names(), vec!["groq"]);
    clear_key_env();
}
