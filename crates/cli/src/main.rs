//! chaincache entry point.
//!
//! Maintenance tool for the on-disk discovery cache: list, read, write and
//! purge the partitions of a namespace. Results go to stdout as JSON;
//! logging goes to stderr.

use std::path::PathBuf;

use anyhow::Result;
use chaincache_core::CacheConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use commands::{GetParams, ListParams, PurgeParams, SetParams};

#[derive(Parser)]
#[command(name = "chaincache")]
#[command(about = "Inspect and maintain the per-chain discovery cache", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Cache root directory (overrides the configuration file)
    #[arg(long, global = true, env = "CHAINCACHE_ROOT_DIR")]
    root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// List the partitions stored for a namespace
    List(ListParams),
    /// Print a cached value
    Get(GetParams),
    /// Store a JSON value and flush it to disk
    Set(SetParams),
    /// Delete partition files
    Purge(PurgeParams),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = CacheConfig::load()?;
    if let Some(root) = cli.root {
        config = config.with_root_dir(root);
    }

    tracing::debug!(root_dir = %config.root_dir.display(), "configuration loaded");

    let output = match cli.command {
        Command::List(params) => commands::list_impl(&config, params).await?,
        Command::Get(params) => commands::get_impl(&config, params).await?,
        Command::Set(params) => commands::set_impl(&config, params).await?,
        Command::Purge(params) => commands::purge_impl(&config, params).await?,
    };

    println!("{output}");

    Ok(())
}
