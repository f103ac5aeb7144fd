//! Configuration schema for buildstash
//!
//! Global configuration is stored at `~/.config/buildstash/config.toml`; a
//! project may override any key in `.buildstash.toml`.

use crate::cache::key::{Architecture, BuildProfile, OperatingSystem, DEFAULT_OS_MARKER};
use crate::lineage::{DEFAULT_ANCESTOR_DEPTH, DEFAULT_LINEAGE_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache resolution settings
    pub cache: CacheConfig,

    /// Platform overrides
    pub platform: PlatformConfig,

    /// Artifact store settings
    pub backend: BackendConfig,

    /// Compile command
    pub build: BuildConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Cache resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Remote branch whose history is trusted, without the `remotes/` prefix
    pub remote_branch: String,

    /// How many ancestors of HEAD to check for the remote branch
    pub ancestor_depth: usize,

    /// How many commits of lineage to search for a cached artifact
    pub lineage_depth: usize,

    /// Build output root; each profile builds into `<build_root>/<profile>`
    pub build_root: PathBuf,

    /// Archive file extension
    pub archive_extension: String,

    /// Where archives are staged (defaults to the repository root)
    pub staging_dir: Option<PathBuf>,

    /// Environment variable holding the archive password
    pub password_env: String,

    /// Profile used when none is given on the command line
    pub default_profile: BuildProfile,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            remote_branch: "origin/main".to_string(),
            ancestor_depth: DEFAULT_ANCESTOR_DEPTH,
            lineage_depth: DEFAULT_LINEAGE_DEPTH,
            build_root: PathBuf::from("_build"),
            archive_extension: "zip".to_string(),
            staging_dir: None,
            password_env: "BUILDSTASH_ARCHIVE_PASSWORD".to_string(),
            default_profile: BuildProfile::Dev,
        }
    }
}

/// Platform overrides (detected from a marker file when unset)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Force the architecture tag
    pub arch: Option<Architecture>,

    /// Force the operating system tag
    pub os: Option<OperatingSystem>,

    /// File whose existence marks macOS
    pub marker_file: PathBuf,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            arch: None,
            os: None,
            marker_file: PathBuf::from(DEFAULT_OS_MARKER),
        }
    }
}

/// Kind of artifact store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Directory tree (local disk or shared mount)
    Local,
    /// Process-local map; nothing survives the run
    Memory,
}

/// Artifact store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Store implementation
    pub kind: BackendKind,

    /// Root of the local store (defaults to the data directory)
    pub path: Option<PathBuf>,

    /// Extra attempts for a lookup the store could not answer
    pub retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Local,
            path: None,
            retries: 2,
        }
    }
}

/// Compile command settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Command and arguments; `{profile}` is replaced by the profile name
    pub command: Vec<String>,

    /// Output substring that marks an up-to-date (no-op) build
    pub noop_marker: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: vec!["make".to_string(), "PROFILE={profile}".to_string()],
            noop_marker: None,
        }
    }
}
