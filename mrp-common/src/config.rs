//! Bootstrap configuration for the media resolution pipeline
//!
//! Configuration file resolution priority:
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`MRP_CONFIG`)
//! 3. Platform config directory (`<config_dir>/mrp/mrp.toml`)
//! 4. Compiled defaults (missing file is a warning, not an error)
//!
//! API keys resolve separately: environment variable (`MRP_<NAME>_API_KEY`) first,
//! then the `[api_keys]` table.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "MRP_CONFIG";

/// Upper bound accepted for `sources.per_page`
pub const MAX_PER_PAGE: u32 = 80;

/// Root of `mrp.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub sources: SourcesConfig,
    pub api_keys: ApiKeys,
    pub keywords: KeywordConfig,
    pub phrase: PhraseConfig,
    pub resolver: ResolverConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Media source selection and HTTP behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    /// Source ids queried for image entries
    pub image: Vec<String>,
    /// Source ids queried for video entries
    pub video: Vec<String>,
    /// Results requested per page
    pub per_page: u32,
    /// Per-source request budget
    pub requests_per_second: u32,
    /// HTTP timeout for a single search request
    pub timeout_secs: u64,
    /// Priority rank overrides keyed by source id (lower wins)
    pub priority: BTreeMap<String, u32>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            image: ["pexels", "unsplash", "pixabay", "openverse"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            video: ["pexels", "pixabay", "giphy"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            per_page: 15,
            requests_per_second: 2,
            timeout_secs: 15,
            priority: BTreeMap::new(),
        }
    }
}

/// Credentials for media sources and text providers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiKeys {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pexels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixabay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsplash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub giphy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openrouter: Option<String>,
}

impl ApiKeys {
    fn table_value(&self, name: &str) -> Option<&String> {
        match name {
            "pexels" => self.pexels.as_ref(),
            "pixabay" => self.pixabay.as_ref(),
            "unsplash" => self.unsplash.as_ref(),
            "giphy" => self.giphy.as_ref(),
            "gemini" => self.gemini.as_ref(),
            "groq" => self.groq.as_ref(),
            "openrouter" => self.openrouter.as_ref(),
            _ => None,
        }
    }

    /// Resolve an API key: `MRP_<NAME>_API_KEY` first, then the TOML table
    ///
    /// Blank values are treated as absent at both tiers.
    pub fn resolve(&self, name: &str) -> Option<String> {
        let env_name = api_key_env_var(name);
        let env_key = std::env::var(&env_name).ok().filter(|k| is_valid_key(k));
        let toml_key = self.table_value(name).filter(|k| is_valid_key(k));

        if env_key.is_some() && toml_key.is_some() {
            warn!(
                "{} API key found in both {} and TOML config. Using environment.",
                name, env_name
            );
        }

        env_key.or_else(|| toml_key.cloned())
    }
}

/// Environment variable holding the API key for `name`
pub fn api_key_env_var(name: &str) -> String {
    format!("MRP_{}_API_KEY", name.to_ascii_uppercase())
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Keyword optimizer cache and provider budgets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeywordConfig {
    /// Maximum cached optimizations before first-in eviction
    pub cache_capacity: usize,
    /// Lifetime of a cached optimization
    pub cache_ttl_hours: i64,
    pub gemini_daily_limit: u32,
    pub groq_daily_limit: u32,
    pub openrouter_daily_limit: u32,
    pub gemini_model: String,
    pub groq_model: String,
    pub openrouter_model: String,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 500,
            cache_ttl_hours: 24,
            gemini_daily_limit: 1400,
            groq_daily_limit: 1000,
            openrouter_daily_limit: 200,
            gemini_model: "gemini-1.5-flash".to_string(),
            groq_model: "llama-3.1-8b-instant".to_string(),
            openrouter_model: "mistralai/mistral-7b-instruct:free".to_string(),
        }
    }
}

/// Global phrase prefixes applied in AI-assisted mode
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhraseConfig {
    pub image_prefix: String,
    pub video_prefix: String,
}

/// Resolver behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Placeholder URL template; `{phrase}` and `{seed}` are substituted
    pub placeholder_template: String,
    /// Drop results of a resolution that was overtaken by a newer one for the same entry
    pub discard_stale_results: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            placeholder_template:
                "https://image.pollinations.ai/prompt/{phrase}?seed={seed}&width=1280&height=720&nologo=true"
                    .to_string(),
            discard_stale_results: false,
        }
    }
}

impl TomlConfig {
    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.sources.per_page == 0 || self.sources.per_page > MAX_PER_PAGE {
            return Err(Error::Config(format!(
                "sources.per_page must be between 1 and {}, got {}",
                MAX_PER_PAGE, self.sources.per_page
            )));
        }
        if self.sources.image.is_empty() || self.sources.video.is_empty() {
            return Err(Error::Config(
                "sources.image and sources.video must each name at least one source \
                 (omit the key to use every source)"
                    .to_string(),
            ));
        }
        if self.sources.requests_per_second == 0 {
            return Err(Error::Config(
                "sources.requests_per_second must be at least 1".to_string(),
            ));
        }
        if self.keywords.cache_capacity == 0 {
            return Err(Error::Config(
                "keywords.cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.keywords.cache_ttl_hours <= 0 {
            return Err(Error::Config(
                "keywords.cache_ttl_hours must be positive".to_string(),
            ));
        }
        if !self.resolver.placeholder_template.contains("{phrase}") {
            return Err(Error::Config(
                "resolver.placeholder_template must contain {phrase}".to_string(),
            ));
        }
        Ok(())
    }
}

/// Platform default config path (`<config_dir>/mrp/mrp.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mrp").join("mrp.toml"))
}

/// Resolve which config file to read, if any
///
/// The CLI argument and environment variable are returned even when the file
/// does not exist so that the caller can report it; the platform default is
/// only returned when present.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|p| p.exists())
}

/// Read and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration with graceful degradation
///
/// A missing file falls back to compiled defaults with a warning. A file that
/// exists but cannot be parsed or validated is an error.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            let config = load_toml_config(&path)?;
            info!("Configuration loaded from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            info!("No config file found, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write config atomically (temp file in the same directory, then rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
