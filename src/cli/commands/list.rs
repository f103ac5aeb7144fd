//! List command - show cached builds for this platform

use super::Workspace;
use crate::cache::CacheDescriptor;
use crate::cli::args::{ListArgs, OutputFormat};
use crate::error::StashResult;
use crate::factory;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the list command
pub async fn execute(args: ListArgs, workspace: &Workspace) -> StashResult<()> {
    let profile = workspace.profile(args.profile);
    let extension = &workspace.config().cache.archive_extension;

    let backend = factory::create_backend(workspace.config());
    backend.setup().await?;
    let artifacts = backend.list(profile).await?;

    if artifacts.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::note(&ctx, &format!("No cached {} builds", profile));
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&artifacts, backend.backend_name()),
        OutputFormat::Json => print_json(&artifacts)?,
        OutputFormat::Plain => print_plain(&artifacts, extension),
    }

    Ok(())
}

fn print_table(artifacts: &[CacheDescriptor], backend: &str) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("Cached builds ({})", backend));

    println!(
        "{:<42} {:<21} {:<8} {:<15}",
        style("COMMIT").bold(),
        style("CREATED").bold(),
        style("PROFILE").bold(),
        style("PLATFORM").bold()
    );
    println!("{}", "-".repeat(88));

    for artifact in artifacts {
        println!(
            "{:<42} {:<21} {:<8} {:<15}",
            artifact.commit,
            artifact.timestamp.format("%Y-%m-%d %H:%M:%S"),
            artifact.profile,
            format!("{}/{}", artifact.arch, artifact.os)
        );
    }

    println!();
    println!("{} build(s)", artifacts.len());
}

fn print_json(artifacts: &[CacheDescriptor]) -> StashResult<()> {
    let json = serde_json::to_string_pretty(artifacts)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(artifacts: &[CacheDescriptor], extension: &str) {
    for artifact in artifacts {
        println!("{}", artifact.remote_path(extension));
    }
}
