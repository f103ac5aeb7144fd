//! Parsers for raw version control output
//!
//! Pure functions over text so they can be tested against fixtures without
//! a repository.

use crate::error::{StashError, StashResult};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::warn;

/// Lineage marker: a graph line starting with this token is a commit on the
/// first lane, i.e. the plain ancestry of the rendered start commit.
const LINEAGE_MARKER: char = '*';

/// Graph connector characters followed by the commit id
static GRAPH_COMMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*[\s|/\\_.\-*]*([0-9a-f]{7,40})\s*$").expect("valid graph commit pattern")
});

/// A single entry of `git status --porcelain`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathChange {
    /// Two-character status code (`??`, ` M`, `A `, ...)
    pub status: String,
    /// Path relative to the repository root
    pub path: PathBuf,
}

/// Parse `git branch -a --contains` output into branch names
///
/// Strips the current branch marker and drops symbolic `HEAD ->` aliases and
/// detached-head placeholders.
pub fn parse_branch_listing(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_start_matches('*').trim())
        .filter(|line| !line.is_empty())
        .filter(|line| !line.contains("HEAD ->"))
        .filter(|line| !line.starts_with('('))
        .map(str::to_string)
        .collect()
}

/// Parse `git rev-list --count` output
pub fn parse_commit_count(command: &str, output: &str) -> StashResult<usize> {
    output
        .trim()
        .parse()
        .map_err(|_| StashError::VcsOutput {
            command: command.to_string(),
            output: output.trim().to_string(),
        })
}

/// Parse `git rev-parse` output into a full commit hash
pub fn parse_commit_hash(command: &str, output: &str) -> StashResult<String> {
    let hash = output.trim();
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(StashError::VcsOutput {
            command: command.to_string(),
            output: hash.to_string(),
        });
    }
    Ok(hash.to_string())
}

/// Extract the lineage from a `git log --graph --format=%H` rendering
///
/// Only lines that begin with the lineage marker are considered. Side-lane
/// commits and pure connector lines are skipped. A marker line without a
/// recognisable hash is dropped with a warning.
pub fn parse_graph_lineage(output: &str) -> Vec<String> {
    let mut lineage = Vec::new();

    for line in output.lines() {
        if !line.starts_with(LINEAGE_MARKER) {
            continue;
        }

        match GRAPH_COMMIT.captures(line) {
            Some(caps) => lineage.push(caps[1].to_string()),
            None => warn!("Skipping unparseable graph line: {:?}", line),
        }
    }

    lineage
}

/// Parse `git status --porcelain` output
pub fn parse_status(output: &str) -> Vec<PathChange> {
    output
        .lines()
        .filter(|line| line.len() > 3)
        .map(|line| {
            let (status, rest) = line.split_at(2);
            let path = rest.trim_start();
            // Renames are reported as "old -> new"
            let path = path.rsplit(" -> ").next().unwrap_or(path);
            PathChange {
                status: status.to_string(),
                path: PathBuf::from(path),
            }
        })
        .collect()
}

/// Group status entries by their status code
pub fn group_by_status(changes: &[PathChange]) -> BTreeMap<String, Vec<PathChange>> {
    let mut groups: BTreeMap<String, Vec<PathChange>> = BTreeMap::new();
    for change in changes {
        groups
            .entry(change.status.clone())
            .or_default()
            .push(change.clone());
    }
    groups
}
