//! Check command - is a cached build available?

use super::Workspace;
use crate::cli::args::CacheArgs;
use crate::error::StashResult;
use crate::resolver::Resolution;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the check command
pub async fn execute(args: CacheArgs, workspace: &Workspace) -> StashResult<()> {
    let ctx = UiContext::detect();
    let request = workspace.request(&args);
    let resolver = workspace.resolver();

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Searching lineage for a cached build...");
    let resolution = match resolver.resolve_cached_build(&request).await {
        Ok(resolution) => resolution,
        Err(e) => {
            spinner.stop_error("Cache check failed");
            return Err(e);
        }
    };

    match resolution {
        Resolution::Cached(descriptor) => {
            spinner.stop(&format!("Cached {} build available", request.profile));
            ui::field(&ctx, "commit", &descriptor.commit);
            ui::field(
                &ctx,
                "created",
                &descriptor.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            );
            ui::field(
                &ctx,
                "path",
                &descriptor.remote_path(&resolver.settings().archive_extension),
            );
        }
        Resolution::Miss => {
            spinner.stop_warn(&format!(
                "No cached {} build in the last {} commit(s) of lineage",
                request.profile,
                resolver.settings().lineage_depth
            ));
        }
        Resolution::StaleLineage => {
            spinner.stop_warn(&format!(
                "Checkout does not include {}",
                request.remote_branch
            ));
            ui::remark(
                &ctx,
                &format!("Rebase onto {} to use the cache", request.remote_branch),
            );
        }
    }

    Ok(())
}
