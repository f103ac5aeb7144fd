//! CLI command implementations

pub mod changes;
pub mod check;
pub mod config;
pub mod lineage;
pub mod list;
pub mod restore;
pub mod run;
pub mod upload;

pub use changes::execute as changes;
pub use check::execute as check;
pub use config::execute as config;
pub use lineage::execute as lineage;
pub use list::execute as list;
pub use restore::execute as restore;
pub use run::execute as run;
pub use upload::execute as upload;

use crate::cache::BuildProfile;
use crate::cli::args::CacheArgs;
use crate::config::Config;
use crate::factory;
use crate::resolver::{CacheRequest, CacheResolver};
use std::path::{Path, PathBuf};

/// Repository root and effective configuration for one invocation
pub struct Workspace {
    root: PathBuf,
    config: Config,
    config_path: PathBuf,
}

impl Workspace {
    pub fn new(root: PathBuf, config: Config, config_path: PathBuf) -> Self {
        Self {
            root,
            config,
            config_path,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Global configuration file in effect
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Profile from the command line, else the configured default
    pub fn profile(&self, requested: Option<BuildProfile>) -> BuildProfile {
        requested.unwrap_or(self.config.cache.default_profile)
    }

    /// Upstream branch from the command line, else the configured one
    pub fn remote_branch(&self, requested: Option<&str>) -> String {
        requested
            .unwrap_or(&self.config.cache.remote_branch)
            .to_string()
    }

    /// Cache request for `args`; the archive password comes from the
    /// environment variable named by `cache.password_env`
    pub fn request(&self, args: &CacheArgs) -> CacheRequest {
        let password = std::env::var(&self.config.cache.password_env)
            .ok()
            .filter(|p| !p.is_empty());

        CacheRequest {
            profile: self.profile(args.profile),
            remote_branch: self.remote_branch(args.remote_branch.as_deref()),
            password,
        }
    }

    pub fn resolver(&self) -> CacheResolver {
        factory::create_resolver(&self.config, &self.root)
    }
}
