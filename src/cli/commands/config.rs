//! Config command - show configuration

use super::Workspace;
use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::error::StashResult;

/// Execute the config command
pub async fn execute(args: ConfigArgs, workspace: &Workspace) -> StashResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => {
            println!("{}", toml::to_string_pretty(workspace.config())?);
        }
        Some(ConfigAction::Path) => {
            println!("{}", workspace.config_path().display());
        }
    }

    Ok(())
}
