//! Restore command - download and unpack the nearest cached build

use super::run::report_restore;
use super::Workspace;
use crate::cli::args::CacheArgs;
use crate::error::StashResult;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the restore command
pub async fn execute(args: CacheArgs, workspace: &Workspace) -> StashResult<()> {
    let ctx = UiContext::detect();
    let request = workspace.request(&args);
    let resolver = workspace.resolver();

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Restoring {} build...", request.profile));

    match resolver.download_and_apply(&request, None).await {
        Ok(Some(report)) => {
            spinner.clear();
            report_restore(&ctx, &report);
        }
        Ok(None) => {
            spinner.stop_warn("Nothing to restore");
            ui::remark(&ctx, "Run `buildstash check` for details");
        }
        Err(e) => {
            spinner.stop_error("Restore failed");
            return Err(e);
        }
    }

    Ok(())
}
