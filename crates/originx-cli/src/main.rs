//! OriginX version catalog maintenance tool.
//!
//! Opens the catalog under the launcher's data directory and runs one
//! command against it. Results go to stdout as JSON; logs go to stderr.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use originx_core::config::AppConfig;
use originx_core::StorageMode;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "originx-versions")]
#[command(about = "Inspect and maintain the OriginX version catalog")]
struct Args {
    /// Catalog data directory (defaults to <data dir>/OriginX/AppData)
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List full version records
    List {
        /// Only versions stored under this mode
        #[arg(long)]
        mode: Option<StorageMode>,
    },
    /// Versions grouped by storage mode and root
    Groups,
    /// Print one version record
    Show { id: String },
    /// Check whether a version is catalogued
    Exists { id: String },
    /// Add every record from a JSON file (one record or an array)
    Import { file: PathBuf },
    /// Move a version to another storage mode and root
    Relocate {
        id: String,
        #[arg(long)]
        mode: StorageMode,
        #[arg(long)]
        root: PathBuf,
    },
    /// Delete versions by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Remove every version
    Clear {
        /// Confirm removal of the whole catalog
        #[arg(long)]
        yes: bool,
    },
    /// Compare the brief index against the shard files
    Verify,
    /// Rebuild the brief index and restore shard placement
    Repair,
    /// Delete expired files from a SmartHybrid version's shared cache
    CleanCache { id: String },
}

fn default_data_root() -> Result<PathBuf> {
    let base = dirs::data_dir().context("Could not determine the platform data directory")?;
    Ok(base
        .join(AppConfig::APP_NAME)
        .join(AppConfig::APP_DATA_DIR_NAME))
}

fn init_logging(debug: bool, json: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug, args.log_json);

    let data_root = match args.data_root {
        Some(path) => path,
        None => default_data_root()?,
    };
    debug!("Catalog root: {}", data_root.display());

    let catalog = originx_core::VersionCatalog::open(&data_root)
        .await
        .with_context(|| format!("Failed to open catalog at {}", data_root.display()))?;

    let output = commands::run(&catalog, args.command).await?;

    // Command result is the program's stdout contract
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
