//! Git command-line implementation of [`VersionControl`]

use crate::error::{StashError, StashResult};
use crate::vcs::VersionControl;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs `git` as a child process inside a repository root
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    /// Create a git client for the working copy at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Repository root this client runs in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Execute a git command and return stdout, failing on non-zero exit
    async fn exec(&self, args: &[&str]) -> StashResult<String> {
        let command = format!("git {}", args.join(" "));
        debug!("Executing: {}", command);

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| StashError::command_failed(command.clone(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StashError::vcs(command, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn status_porcelain(&self) -> StashResult<String> {
        self.exec(&["status", "--porcelain"]).await
    }

    async fn graph_log(&self, start: &str, max_count: usize) -> StashResult<String> {
        let max_count = format!("--max-count={}", max_count);
        self.exec(&["log", "--graph", "--format=%H", &max_count, start])
            .await
    }

    async fn branches_containing(&self, reference: &str) -> StashResult<String> {
        self.exec(&["branch", "-a", "--contains", reference]).await
    }

    async fn rev_list_count(&self, reference: &str) -> StashResult<String> {
        self.exec(&["rev-list", "--count", reference]).await
    }

    async fn rev_parse(&self, reference: &str) -> StashResult<String> {
        self.exec(&["rev-parse", reference]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn non_repository_is_fatal() {
        let dir = TempDir::new().unwrap();
        let git = GitCli::new(dir.path());

        // Either git is missing (CommandFailed) or it reports "not a git repository"
        let err = git.rev_list_count("HEAD").await.unwrap_err();
        assert!(matches!(
            err,
            StashError::Vcs { .. } | StashError::CommandFailed { .. }
        ));
    }

    #[test]
    fn root_is_kept() {
        let git = GitCli::new("/tmp/repo");
        assert_eq!(git.root(), Path::new("/tmp/repo"));
    }
}
