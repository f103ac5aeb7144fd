//! buildstash - commit-keyed build artifact cache
//!
//! CLI entry point that dispatches to subcommands.

use buildstash::cli::commands::{self, Workspace};
use buildstash::cli::{Cli, Commands};
use buildstash::config::ConfigManager;
use buildstash::error::{StashError, StashResult};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> StashResult<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().map_err(|e| StashError::io("getting current directory", e))?;
    let root = cli.root.clone().unwrap_or_else(|| cwd.clone());

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        None
    } else {
        ConfigManager::find_local_config(&root)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, config.general.verbose, &config.general.log_format);
    if let Some(ref path) = local_config_path {
        debug!("Using local config: {}", path.display());
    }

    let workspace = Workspace::new(root, config, config_manager.path().to_path_buf());

    match cli.command {
        Commands::Run(args) => commands::run(args, &workspace).await,
        Commands::Check(args) => commands::check(args, &workspace).await,
        Commands::Restore(args) => commands::restore(args, &workspace).await,
        Commands::Upload(args) => commands::upload(args, &workspace).await,
        Commands::List(args) => commands::list(args, &workspace).await,
        Commands::Lineage(args) => commands::lineage(args, &workspace).await,
        Commands::Changes(args) => commands::changes(args, &workspace).await,
        Commands::Config(args) => commands::config(args, &workspace).await,
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug; `general.verbose` counts as one `-v`
fn init_logging(flag_count: u8, config_verbose: bool, format: &str) {
    let level = flag_count.max(u8::from(config_verbose));
    let filter = match level {
        0 => EnvFilter::new("buildstash=warn"),
        1 => EnvFilter::new("buildstash=info"),
        _ => EnvFilter::new("buildstash=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);

    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
