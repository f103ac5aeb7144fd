//! CLI argument definitions using clap derive

use crate::cache::BuildProfile;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// buildstash - reuse compiled build output across git checkouts
///
/// Finds the nearest upstream commit with a cached build, restores it,
/// compiles only what changed and publishes the result for others.
#[derive(Parser, Debug)]
#[command(name = "buildstash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "BUILDSTASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .buildstash.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Repository root (defaults to current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore the nearest cached build, compile, and refresh the cache
    Run(RunArgs),

    /// Report whether a cached build is available
    Check(CacheArgs),

    /// Download and unpack the nearest cached build
    Restore(CacheArgs),

    /// Archive the local build and upload it
    Upload(CacheArgs),

    /// List cached builds for this platform
    List(ListArgs),

    /// Show the nearest upstream commit and the searched lineage
    Lineage(LineageArgs),

    /// Show uncommitted changes grouped by status
    Changes(ChangesArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Profile and upstream selection shared by cache commands
#[derive(Parser, Debug, Clone)]
pub struct CacheArgs {
    /// Build profile (defaults to cache.default_profile)
    #[arg(short, long)]
    pub profile: Option<BuildProfile>,

    /// Upstream branch, e.g. origin/main (defaults to cache.remote_branch)
    #[arg(long)]
    pub remote_branch: Option<String>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Skip the cache and compile from scratch
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Build profile (defaults to cache.default_profile)
    #[arg(short, long)]
    pub profile: Option<BuildProfile>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the lineage command
#[derive(Parser, Debug)]
pub struct LineageArgs {
    /// Upstream branch, e.g. origin/main (defaults to cache.remote_branch)
    #[arg(long)]
    pub remote_branch: Option<String>,

    /// Number of lineage commits to show (defaults to cache.lineage_depth)
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments for the changes command
#[derive(Parser, Debug)]
pub struct ChangesArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
