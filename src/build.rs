//! External compile step
//!
//! The build system is a collaborator: it is invoked once per phase and its
//! result is reduced to "proceed" or "abort".

use crate::cache::BuildProfile;
use crate::config::schema::BuildConfig;
use crate::error::{StashError, StashResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Max number of output lines kept in build failure messages
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Result of a compile that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Sources were compiled
    Success,
    /// Everything was already up to date
    NoOp,
}

/// Runs the project's compiler for a profile
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Compile `profile`. Failures are reported as `StashError::BuildFailed`.
    async fn compile(&self, profile: BuildProfile) -> StashResult<BuildOutcome>;
}

/// Compiles by running the configured command in the repository root
pub struct CommandBuildRunner {
    root: PathBuf,
    config: BuildConfig,
}

impl CommandBuildRunner {
    /// Create a runner for `config.command` executed in `root`
    pub fn new(root: impl Into<PathBuf>, config: BuildConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// The command line for `profile`, with `{profile}` substituted
    pub fn command_for(&self, profile: BuildProfile) -> Vec<String> {
        self.config
            .command
            .iter()
            .map(|arg| arg.replace("{profile}", profile.as_str()))
            .collect()
    }
}

#[async_trait]
impl BuildRunner for CommandBuildRunner {
    async fn compile(&self, profile: BuildProfile) -> StashResult<BuildOutcome> {
        let argv = self.command_for(profile);
        let (program, args) = argv.split_first().ok_or(StashError::BuildNotConfigured)?;
        let command = argv.join(" ");
        info!("Compiling {}: {}", profile, command);

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.root)
            .env("BUILDSTASH_PROFILE", profile.as_str())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| StashError::command_failed(command.clone(), e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(StashError::BuildFailed {
                detail: build_error_output(&stdout, &stderr),
            });
        }

        let noop = self
            .config
            .noop_marker
            .as_deref()
            .is_some_and(|marker| stdout.contains(marker) || stderr.contains(marker));

        debug!("Compile finished (no-op: {})", noop);
        Ok(if noop {
            BuildOutcome::NoOp
        } else {
            BuildOutcome::Success
        })
    }
}

/// Extract the useful tail of build output for error diagnostics
fn build_error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail = if total > BUILD_ERROR_TAIL_LINES {
        &lines[total - BUILD_ERROR_TAIL_LINES..]
    } else {
        &lines[..]
    };
    tail.join("\n")
}
