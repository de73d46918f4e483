//! mrp-resolver command-line front end
//!
//! Reads media entries from a JSON file, runs them through the pipeline and
//! writes the updated entries back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mrp_common::config::{self, TomlConfig};
use mrp_common::SystemClock;
use mrp_resolver::{MediaEntry, ResolveOverrides, Resolver, SharedEntry};
use tracing::{info, warn};
use uuid::Uuid;

/// Command-line arguments for mrp-resolver
#[derive(Parser, Debug)]
#[command(name = "mrp-resolver")]
#[command(about = "Resolve media entries to stock images and video clips")]
#[command(version)]
struct Args {
    /// Configuration file (overrides MRP_CONFIG and the platform default)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve every entry in a JSON file
    Resolve {
        /// JSON array of media entries
        #[arg(long)]
        entries: PathBuf,

        /// Write updated entries here instead of in place
        #[arg(long)]
        output: Option<PathBuf>,

        /// Candidate count for every entry (1-4)
        #[arg(long)]
        count: Option<u8>,

        /// Search phrase for every entry
        #[arg(long)]
        phrase: Option<String>,
    },

    /// Set a user-supplied URL as an entry's primary reference
    Apply {
        #[arg(long)]
        entries: PathBuf,

        #[arg(long)]
        id: Uuid,

        #[arg(long)]
        url: String,
    },

    /// Write a default configuration file
    Init {
        /// Destination (defaults to the resolved config path)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let command = match args.command {
        Command::Init { path } => return init(path.as_deref().or(args.config.as_deref())),
        command => command,
    };

    let config = config::load_config(args.config.as_deref()).context("Failed to load config")?;
    config.validate().context("Invalid config")?;
    mrp_common::logging::init(&config.logging).context("Failed to initialize logging")?;

    // load_config runs before a subscriber exists, so report the source here
    info!("Starting mrp-resolver {}", env!("CARGO_PKG_VERSION"));
    match config::resolve_config_path(args.config.as_deref()) {
        Some(path) if path.exists() => info!(path = %path.display(), "Configuration loaded"),
        Some(path) => warn!(
            path = %path.display(),
            "Config file not found, using compiled defaults"
        ),
        None => info!("No config file found, using compiled defaults"),
    }
    let resolver = Resolver::from_config(&config, Arc::new(SystemClock));

    match command {
        Command::Resolve {
            entries,
            output,
            count,
            phrase,
        } => {
            let shared = read_entries(&entries)?;
            let overrides = ResolveOverrides { phrase, count };
            let results = resolver.resolve_batch(&shared, Some(&overrides)).await;

            write_entries(output.as_deref().unwrap_or(&entries), &shared).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Apply { entries, id, url } => {
            let shared = read_entries(&entries)?;
            let mut target = None;
            for entry in &shared {
                if entry.read().await.id == id {
                    target = Some(entry.clone());
                    break;
                }
            }
            let Some(entry) = target else {
                bail!("No entry with id {}", id);
            };

            resolver.apply_candidate(&entry, &url).await?;
            write_entries(&entries, &shared).await?;
        }
        Command::Init { .. } => {}
    }

    Ok(())
}

fn init(path: Option<&Path>) -> Result<()> {
    let Some(path) = config::resolve_config_path(path) else {
        bail!("No config directory available; pass --path");
    };
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    config::write_toml_config(&TomlConfig::default(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn read_entries(path: &Path) -> Result<Vec<SharedEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let entries: Vec<MediaEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(entries.into_iter().map(MediaEntry::into_shared).collect())
}

async fn write_entries(path: &Path, entries: &[SharedEntry]) -> Result<()> {
    let mut plain = Vec::with_capacity(entries.len());
    for entry in entries {
        plain.push(entry.read().await.clone());
    }
    let content = serde_json::to_string_pretty(&plain)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(entries = plain.len(), path = %path.display(), "Entries written");
    Ok(())
}
