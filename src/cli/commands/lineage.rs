//! Lineage command - show where the cache search starts and what it covers

use super::Workspace;
use crate::cli::args::{LineageArgs, OutputFormat};
use crate::error::StashResult;
use crate::factory;
use crate::ui::{self, UiContext};
use console::style;
use serde_json::json;

/// Execute the lineage command
pub async fn execute(args: LineageArgs, workspace: &Workspace) -> StashResult<()> {
    let cache = &workspace.config().cache;
    let remote_branch = workspace.remote_branch(args.remote_branch.as_deref());
    let depth = args.depth.unwrap_or(cache.lineage_depth);

    let lineage = factory::create_lineage(workspace.root());
    let common = lineage
        .nearest_common_commit(&remote_branch, cache.ancestor_depth)
        .await?;

    let Some(common) = common else {
        match args.format {
            OutputFormat::Json => println!("{}", json!({ "common": null, "lineage": [] })),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::warn_with_fix(
                    &ctx,
                    &format!(
                        "No ancestor within {} commit(s) is on {}",
                        cache.ancestor_depth, remote_branch
                    ),
                    &format!("git fetch && git rebase {}", remote_branch),
                );
            }
        }
        return Ok(());
    };

    let commits = lineage.linearize(&common.hash, depth).await?;

    match args.format {
        OutputFormat::Json => {
            let value = json!({ "common": common, "lineage": commits });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Plain => {
            for commit in &commits {
                println!("{}", commit);
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, &format!("Lineage from {}", remote_branch));
            ui::field(&ctx, "common commit", &common.hash);
            ui::field(&ctx, "behind HEAD", &common.distance.to_string());
            println!();
            for (position, commit) in commits.iter().enumerate() {
                println!("{:>4}  {}", style(position).dim(), commit);
            }
            println!();
            println!("{} commit(s)", commits.len());
        }
    }

    Ok(())
}
