//! Wiring of collaborators from configuration
//!
//! Commands never construct backends or tools directly; they ask here so the
//! choice stays in one place.

use crate::archive::{ArchivePackager, ZipTool};
use crate::build::CommandBuildRunner;
use crate::cache::{CacheBackend, LocalBackend, MemoryBackend};
use crate::config::schema::BackendKind;
use crate::config::Config;
use crate::lineage::CommitLineage;
use crate::resolver::{CacheResolver, ResolverSettings};
use crate::vcs::GitCli;
use std::path::Path;
use tracing::debug;

/// Create the artifact store selected by `backend.kind`
pub fn create_backend(config: &Config) -> Box<dyn CacheBackend> {
    let platform = config.platform.resolve();
    match config.backend.kind {
        BackendKind::Local => {
            Box::new(LocalBackend::new(config.backend.store_dir(), platform))
        }
        BackendKind::Memory => Box::new(MemoryBackend::new(platform)),
    }
}

/// History queries against the git checkout at `root`
pub fn create_lineage(root: &Path) -> CommitLineage {
    CommitLineage::new(Box::new(GitCli::new(root)))
}

/// A resolver for the checkout at `root`, using git, zip and the configured
/// backend and build command
pub fn create_resolver(config: &Config, root: &Path) -> CacheResolver {
    let backend = create_backend(config);
    debug!(
        "Using {} backend for {}",
        backend.backend_name(),
        root.display()
    );

    CacheResolver::new(
        create_lineage(root),
        backend,
        ArchivePackager::new(root, Box::new(ZipTool::new())),
        Box::new(CommandBuildRunner::new(root, config.build.clone())),
        ResolverSettings::from_config(config),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Architecture, OperatingSystem};
    use tempfile::TempDir;

    #[test]
    fn backend_kind_selects_store() {
        let mut config = Config::default();
        assert_eq!(create_backend(&config).backend_name(), "local");

        config.backend.kind = BackendKind::Memory;
        assert_eq!(create_backend(&config).backend_name(), "memory");
    }

    #[test]
    fn resolver_uses_configured_platform() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.platform.os = Some(OperatingSystem::Macos);
        config.cache.lineage_depth = 25;

        let resolver = create_resolver(&config, dir.path());
        assert_eq!(resolver.settings().platform.arch, Architecture::Aarch64);
        assert_eq!(resolver.settings().lineage_depth, 25);
    }
}
