//! Upload command - archive the local build and publish it

use super::run::report_upload;
use super::Workspace;
use crate::cli::args::CacheArgs;
use crate::error::StashResult;
use crate::ui::{TaskSpinner, UiContext};

/// Execute the upload command
pub async fn execute(args: CacheArgs, workspace: &Workspace) -> StashResult<()> {
    let ctx = UiContext::detect();
    let request = workspace.request(&args);
    let resolver = workspace.resolver();

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Archiving {} build...", request.profile));

    match resolver.create_and_upload(&request).await {
        Ok(report) => {
            spinner.clear();
            report_upload(&ctx, &report);
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Upload failed");
            Err(e)
        }
    }
}
