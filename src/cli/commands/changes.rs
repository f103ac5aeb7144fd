//! Changes command - uncommitted files grouped by status

use super::Workspace;
use crate::cli::args::{ChangesArgs, OutputFormat};
use crate::error::StashResult;
use crate::factory;
use crate::ui::{self, UiContext};
use crate::vcs::parse::group_by_status;
use console::style;

/// Execute the changes command
pub async fn execute(args: ChangesArgs, workspace: &Workspace) -> StashResult<()> {
    let changes = factory::create_lineage(workspace.root())
        .current_changes()
        .await?;

    match args.format {
        OutputFormat::Json => {
            let grouped = group_by_status(&changes);
            println!("{}", serde_json::to_string_pretty(&grouped)?);
        }
        OutputFormat::Plain => {
            for change in &changes {
                println!("{} {}", change.status, change.path.display());
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            if changes.is_empty() {
                ui::done(&ctx, "Working tree clean", None);
                return Ok(());
            }

            for (status, group) in group_by_status(&changes) {
                ui::section(&ctx, &format!("{} ({})", describe(&status), group.len()));
                for change in group {
                    println!("  {} {}", style(&status).dim(), change.path.display());
                }
            }
        }
    }

    Ok(())
}

/// Human name for a porcelain status code
fn describe(status: &str) -> &'static str {
    match status {
        "??" => "Untracked",
        "!!" => "Ignored",
        s if s.contains('U') => "Unmerged",
        s if s.starts_with('R') => "Renamed",
        s if s.starts_with('A') => "Added",
        s if s.contains('D') => "Deleted",
        s if s.contains('M') => "Modified",
        _ => "Changed",
    }
}
