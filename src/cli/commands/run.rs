//! Run command - restore, compile, refresh

use super::Workspace;
use crate::build::BuildOutcome;
use crate::cli::args::RunArgs;
use crate::error::StashResult;
use crate::resolver::{RestoreReport, RunOutcome, UploadReport};
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the run command
pub async fn execute(args: RunArgs, workspace: &Workspace) -> StashResult<()> {
    let ctx = UiContext::detect();
    let request = workspace.request(&args.cache);
    let resolver = workspace.resolver();

    ui::intro(&ctx, &format!("buildstash run ({})", request.profile));

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Resolving cache against {}...", request.remote_branch));

    let outcome = match resolver.decide_and_act(&request, args.force).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error("Run failed");
            return Err(e);
        }
    };
    spinner.clear();

    match outcome {
        RunOutcome::Restored {
            restore,
            build,
            upload,
        } => {
            report_restore(&ctx, &restore);
            report_build(&ctx, build);
            report_upload(&ctx, &upload);
        }
        RunOutcome::Rebuilt { build, upload } => {
            if args.force {
                ui::note(&ctx, "Cache skipped (--force)");
            } else {
                ui::note(&ctx, "No usable cache, compiled from scratch");
            }
            report_build(&ctx, build);
            match upload {
                Some(upload) => report_upload(&ctx, &upload),
                None => ui::warn_with_fix(
                    &ctx,
                    "Not uploaded: no ancestor is on the upstream branch",
                    &format!("git fetch && git rebase {}", request.remote_branch),
                ),
            }
        }
    }

    ui::outro_success(&ctx, "Done");
    Ok(())
}

pub(super) fn report_restore(ctx: &UiContext, restore: &RestoreReport) {
    ui::done(
        ctx,
        "Restored cached build",
        Some(&restore.descriptor.encode(None)),
    );
    ui::timing(ctx, "resolve", restore.resolve);
    ui::timing(ctx, "download", restore.download);
    ui::timing(ctx, "unpack", restore.unpack);
}

pub(super) fn report_upload(ctx: &UiContext, upload: &UploadReport) {
    ui::done(ctx, "Uploaded", Some(&upload.metadata.remote_path));
    ui::field(ctx, "size", &format!("{} bytes", upload.metadata.size_bytes));
    ui::field(ctx, "sha256", &upload.metadata.sha256);
}

fn report_build(ctx: &UiContext, build: BuildOutcome) {
    match build {
        BuildOutcome::Success => ui::done(ctx, "Compiled", None),
        BuildOutcome::NoOp => ui::done(ctx, "Compiled", Some("already up to date")),
    }
}
