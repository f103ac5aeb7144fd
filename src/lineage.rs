//! Commit lineage queries
//!
//! Answers two questions about the checkout's history: which is the nearest
//! ancestor already published on the upstream branch, and in what order
//! commits should be searched for a cached build.

use crate::error::StashResult;
use crate::vcs::parse::{self, PathChange};
use crate::vcs::{ancestor_ref, VersionControl};
use serde::Serialize;
use tracing::{debug, info};

/// Default bound for the upstream ancestor walk
pub const DEFAULT_ANCESTOR_DEPTH: usize = 200;

/// Default bound for the cache search lineage
pub const DEFAULT_LINEAGE_DEPTH: usize = 100;

/// Nearest ancestor of the checkout that is contained in the remote branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonCommit {
    /// Full hash of the ancestor
    pub hash: String,
    /// Distance from HEAD (0 = the checkout itself)
    pub distance: usize,
    /// Every branch containing the ancestor
    pub branches: Vec<String>,
}

/// History queries over a working copy
pub struct CommitLineage {
    vcs: Box<dyn VersionControl>,
}

impl CommitLineage {
    /// Wrap a version control client
    pub fn new(vcs: Box<dyn VersionControl>) -> Self {
        Self { vcs }
    }

    /// Branches (local and `remotes/...`) that contain `reference`
    pub async fn branches_containing(&self, reference: &str) -> StashResult<Vec<String>> {
        let output = self.vcs.branches_containing(reference).await?;
        Ok(parse::parse_branch_listing(&output))
    }

    /// Number of commits reachable from `reference`
    pub async fn commit_count(&self, reference: &str) -> StashResult<usize> {
        let output = self.vcs.rev_list_count(reference).await?;
        parse::parse_commit_count(&format!("git rev-list --count {}", reference), &output)
    }

    /// Walk `HEAD~0..HEAD~(n-1)` and return the first ancestor contained in
    /// `remote_branch` (e.g. `origin/main`).
    ///
    /// `n` is `max_depth` capped by the number of reachable commits. Returns
    /// `None` when no ancestor within the bound qualifies. The walk stops at
    /// the first hit, so the nearest ancestor always wins.
    pub async fn nearest_common_commit(
        &self,
        remote_branch: &str,
        max_depth: usize,
    ) -> StashResult<Option<CommonCommit>> {
        let qualified = format!("remotes/{}", remote_branch);
        let total = self.commit_count("HEAD").await?;
        let depth = max_depth.min(total);

        for distance in 0..depth {
            let reference = ancestor_ref(distance);
            let branches = self.branches_containing(&reference).await?;

            if branches.iter().any(|b| *b == qualified) {
                let output = self.vcs.rev_parse(&reference).await?;
                let hash =
                    parse::parse_commit_hash(&format!("git rev-parse {}", reference), &output)?;
                info!(
                    "Nearest commit on {}: {} ({} behind HEAD)",
                    remote_branch, hash, distance
                );
                return Ok(Some(CommonCommit {
                    hash,
                    distance,
                    branches,
                }));
            }
        }

        debug!(
            "No ancestor within {} commits is contained in {}",
            depth, qualified
        );
        Ok(None)
    }

    /// Cache search order starting at `start`, nearest first
    ///
    /// Covers `start` plus at most `min(max_depth, commit_count(start)) - 1`
    /// earlier commits, as drawn on the first lane of the commit graph.
    pub async fn linearize(&self, start: &str, max_depth: usize) -> StashResult<Vec<String>> {
        let limit = max_depth.min(self.commit_count(start).await?);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let output = self.vcs.graph_log(start, limit).await?;
        let mut lineage = parse::parse_graph_lineage(&output);
        lineage.truncate(limit);

        debug!("Lineage from {}: {} commit(s)", start, lineage.len());
        Ok(lineage)
    }

    /// Uncommitted changes in the working copy
    pub async fn current_changes(&self) -> StashResult<Vec<PathChange>> {
        let output = self.vcs.status_porcelain().await?;
        Ok(parse::parse_status(&output))
    }
}
