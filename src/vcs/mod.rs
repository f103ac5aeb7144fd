//! Version control access
//!
//! The history tool is treated as a black box that returns text. Process
//! invocation sits behind [`VersionControl`]; all parsing of its output lives
//! in [`parse`] so it can be exercised against fixed fixtures.

#[cfg(test)]
pub(crate) mod fake;
mod git;
pub mod parse;

pub use git::GitCli;
pub use parse::PathChange;

use crate::error::StashResult;
use async_trait::async_trait;

/// Raw text queries against a working copy
///
/// Every method returns the tool's stdout. A non-zero exit is reported as
/// `StashError::Vcs` and is not expected to be recovered from.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Porcelain status of the working copy, one entry per line
    async fn status_porcelain(&self) -> StashResult<String>;

    /// Commit graph rendering of at most `max_count` commits reachable from `start`
    async fn graph_log(&self, start: &str, max_count: usize) -> StashResult<String>;

    /// Local and remote branches that contain `reference`
    async fn branches_containing(&self, reference: &str) -> StashResult<String>;

    /// Number of commits reachable from `reference`
    async fn rev_list_count(&self, reference: &str) -> StashResult<String>;

    /// Full hash of the commit `reference` points at
    async fn rev_parse(&self, reference: &str) -> StashResult<String>;
}

/// Symbolic reference to the `n`-th first-parent ancestor of the checkout
pub fn ancestor_ref(n: usize) -> String {
    format!("HEAD~{}", n)
}
