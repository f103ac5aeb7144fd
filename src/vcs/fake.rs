//! Scripted [`VersionControl`] for tests

use crate::error::{StashError, StashResult};
use crate::vcs::VersionControl;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// In-memory repository history with a call log
#[derive(Clone, Default)]
pub(crate) struct FakeVcs {
    /// First-parent ancestors of HEAD, nearest first, with the branches containing each
    pub ancestors: Vec<(String, Vec<String>)>,
    /// Raw graph rendering returned by `graph_log`; rendered from `lineage` when unset
    pub graph: Option<String>,
    /// Commits rendered by `graph_log` when no raw graph is set
    pub lineage: Vec<String>,
    /// Raw porcelain status
    pub status: String,
    /// Every query issued, in order
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeVcs {
    /// History of `depth` commits where only ancestors at `shared` are on the remote branch
    pub fn with_history(depth: usize, shared: &[usize], remote: &str) -> Self {
        let ancestors = (0..depth)
            .map(|i| {
                let mut branches = vec!["feature".to_string()];
                if shared.contains(&i) {
                    branches.push(format!("remotes/{}", remote));
                }
                (fake_hash(i), branches)
            })
            .collect();

        Self {
            ancestors,
            lineage: (0..depth).map(fake_hash).collect(),
            ..Self::default()
        }
    }

    /// Calls whose text starts with `prefix`
    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn ancestor_index(reference: &str) -> Option<usize> {
        reference.strip_prefix("HEAD~")?.parse().ok()
    }
}

/// Deterministic 40-character hash for the `i`-th ancestor
pub(crate) fn fake_hash(i: usize) -> String {
    format!("{:040x}", 0xc0ffee_usize + i)
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn status_porcelain(&self) -> StashResult<String> {
        self.record("status".to_string());
        Ok(self.status.clone())
    }

    async fn graph_log(&self, start: &str, max_count: usize) -> StashResult<String> {
        self.record(format!("log {} {}", start, max_count));
        if let Some(ref graph) = self.graph {
            return Ok(graph.clone());
        }
        let skip = self.lineage.iter().position(|h| h == start).unwrap_or(0);
        Ok(self
            .lineage
            .iter()
            .skip(skip)
            .take(max_count)
            .map(|h| format!("* {}\n", h))
            .collect())
    }

    async fn branches_containing(&self, reference: &str) -> StashResult<String> {
        self.record(format!("branch {}", reference));
        let (_, branches) = Self::ancestor_index(reference)
            .and_then(|i| self.ancestors.get(i))
            .ok_or_else(|| StashError::vcs("git branch", "unknown revision"))?;
        Ok(branches.iter().map(|b| format!("  {}\n", b)).collect())
    }

    async fn rev_list_count(&self, reference: &str) -> StashResult<String> {
        self.record(format!("count {}", reference));
        let total = self.ancestors.len().max(self.lineage.len());
        let count = match Self::ancestor_index(reference) {
            Some(i) => total.saturating_sub(i),
            None if reference == "HEAD" => total,
            None => {
                let pos = self.lineage.iter().position(|h| h == reference).unwrap_or(0);
                total - pos
            }
        };
        Ok(format!("{}\n", count))
    }

    async fn rev_parse(&self, reference: &str) -> StashResult<String> {
        self.record(format!("rev-parse {}", reference));
        match Self::ancestor_index(reference) {
            Some(i) => self
                .ancestors
                .get(i)
                .map(|(hash, _)| format!("{}\n", hash))
                .ok_or_else(|| StashError::vcs("git rev-parse", "unknown revision")),
            None => Ok(format!("{}\n", reference)),
        }
    }
}
