//! Cache resolution and the create/restore flows
//!
//! A checkout is in one of three states with respect to the cache:
//!
//! | State | Meaning | Action |
//! |-------|---------|--------|
//! | Cached | An ancestor on the upstream lineage has an artifact | restore, compile the delta, refresh |
//! | Miss | Descends from upstream, nothing cached in the searched lineage | compile, upload |
//! | StaleLineage | No ancestor within reach is on the upstream branch | compile |
//!
//! Every call into version control, the archiver and the backend is awaited
//! in sequence; one resolution runs per process.

use crate::archive::ArchivePackager;
use crate::build::{BuildOutcome, BuildRunner};
use crate::cache::{BuildProfile, CacheBackend, CacheDescriptor, Platform, UploadMetadata};
use crate::config::Config;
use crate::error::{BackendError, StashError, StashResult};
use crate::lineage::{CommitLineage, CommonCommit};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What the caller wants cached or restored
#[derive(Debug, Clone)]
pub struct CacheRequest {
    /// Build profile to resolve
    pub profile: BuildProfile,
    /// Upstream branch without the `remotes/` prefix, e.g. `origin/main`
    pub remote_branch: String,
    /// Archive password, if archives are encrypted
    pub password: Option<String>,
}

impl CacheRequest {
    fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// Answer to "is there a usable cache?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Artifact found for the nearest cached commit
    Cached(CacheDescriptor),
    /// The checkout does not descend from anything known upstream
    StaleLineage,
    /// Nothing cached anywhere in the searched lineage
    Miss,
}

/// Tunables for a resolver
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Platform artifacts are produced for and looked up with
    pub platform: Platform,
    /// Bound of the upstream ancestor walk
    pub ancestor_depth: usize,
    /// Bound of the cache search lineage
    pub lineage_depth: usize,
    /// Build output root, relative to the repository root
    pub build_root: PathBuf,
    /// Archive staging directory, relative to the repository root
    pub staging_dir: PathBuf,
    /// Archive file extension
    pub archive_extension: String,
    /// Extra attempts for lookups the backend could not answer
    pub backend_retries: u32,
}

impl ResolverSettings {
    /// Settings from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            platform: config.platform.resolve(),
            ancestor_depth: config.cache.ancestor_depth,
            lineage_depth: config.cache.lineage_depth,
            build_root: config.cache.build_root.clone(),
            staging_dir: config.cache.staging_dir.clone().unwrap_or_default(),
            archive_extension: config.cache.archive_extension.clone(),
            backend_retries: config.backend.retries,
        }
    }

    /// Build directory for `profile`, relative to the repository root
    pub fn build_dir(&self, profile: BuildProfile) -> PathBuf {
        self.build_root.join(profile.as_str())
    }
}

/// A freshly uploaded artifact
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub descriptor: CacheDescriptor,
    pub metadata: UploadMetadata,
}

/// A restored artifact and how long each phase took
#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub descriptor: CacheDescriptor,
    pub resolve: Duration,
    pub download: Duration,
    pub unpack: Duration,
}

/// What `decide_and_act` ended up doing
#[derive(Debug)]
pub enum RunOutcome {
    /// Compiled from scratch; `upload` is `None` when there was nothing to key it to
    Rebuilt {
        build: BuildOutcome,
        upload: Option<UploadReport>,
    },
    /// Restored a cached build, compiled the delta and refreshed the cache
    Restored {
        restore: RestoreReport,
        build: BuildOutcome,
        upload: UploadReport,
    },
}

/// Combines lineage, cache keys, the backend and the archiver
pub struct CacheResolver {
    lineage: CommitLineage,
    backend: Box<dyn CacheBackend>,
    packager: ArchivePackager,
    builder: Box<dyn BuildRunner>,
    settings: ResolverSettings,
}

impl CacheResolver {
    /// Assemble a resolver from its collaborators
    pub fn new(
        lineage: CommitLineage,
        backend: Box<dyn CacheBackend>,
        packager: ArchivePackager,
        builder: Box<dyn BuildRunner>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            lineage,
            backend,
            packager,
            builder,
            settings,
        }
    }

    /// Settings in effect
    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    async fn nearest_common_commit(&self, remote_branch: &str) -> StashResult<Option<CommonCommit>> {
        self.lineage
            .nearest_common_commit(remote_branch, self.settings.ancestor_depth)
            .await
    }

    /// Whether the checkout descends from a commit on `remote_branch`
    pub async fn current_code_includes_upstream(&self, remote_branch: &str) -> StashResult<bool> {
        Ok(self.nearest_common_commit(remote_branch).await?.is_some())
    }

    /// Search the upstream lineage, nearest first, for a cached artifact
    pub async fn resolve_cached_build(&self, request: &CacheRequest) -> StashResult<Resolution> {
        let Some(common) = self.nearest_common_commit(&request.remote_branch).await? else {
            info!(
                "Checkout does not include {}; no cache applies",
                request.remote_branch
            );
            return Ok(Resolution::StaleLineage);
        };

        self.backend.setup().await?;

        let candidates = self
            .lineage
            .linearize(&common.hash, self.settings.lineage_depth)
            .await?;
        debug!("Searching {} candidate commit(s)", candidates.len());

        for (position, commit) in candidates.iter().enumerate() {
            let wanted = CacheDescriptor::new(
                self.settings.platform,
                request.profile,
                commit.as_str(),
                Utc::now(),
            );

            match self.lookup(&wanted).await {
                Ok(found) => {
                    info!(
                        "Cache hit for {} at {} ({} commit(s) behind {})",
                        request.profile, found.commit, position, common.hash
                    );
                    return Ok(Resolution::Cached(found));
                }
                Err(BackendError::NotFound) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            "No cached {} build in {} commit(s) of lineage",
            request.profile,
            candidates.len()
        );
        Ok(Resolution::Miss)
    }

    /// One lookup, repeating transient failures up to the configured limit
    async fn lookup(&self, wanted: &CacheDescriptor) -> Result<CacheDescriptor, BackendError> {
        let mut attempt = 0;
        loop {
            match self.backend.fetch_by_descriptor(wanted).await {
                Err(e) if e.is_transient() && attempt < self.settings.backend_retries => {
                    attempt += 1;
                    warn!(
                        "Lookup for {} failed ({}), retrying ({}/{})",
                        wanted.commit, e, attempt, self.settings.backend_retries
                    );
                }
                result => return result,
            }
        }
    }

    /// Package the local build of `request.profile` and upload it, keyed to
    /// the nearest commit shared with the upstream branch
    pub async fn create_and_upload(&self, request: &CacheRequest) -> StashResult<UploadReport> {
        let build_dir = self.settings.build_dir(request.profile);
        let absolute = self.packager.root().join(&build_dir);
        if !absolute.is_dir() {
            return Err(StashError::BuildDirMissing(absolute));
        }

        let common = self
            .nearest_common_commit(&request.remote_branch)
            .await?
            .ok_or_else(|| StashError::NoCommonAncestor {
                remote_branch: request.remote_branch.clone(),
            })?;

        let descriptor = CacheDescriptor::new(
            self.settings.platform,
            request.profile,
            common.hash,
            Utc::now(),
        );
        let extension = &self.settings.archive_extension;
        let staged = self
            .settings
            .staging_dir
            .join(descriptor.encode(Some(extension.as_str())));

        let archive = self
            .packager
            .pack(&build_dir, &staged, request.password())
            .await?;

        let uploaded = self
            .upload_archive(&archive, &descriptor.remote_path(extension))
            .await;
        remove_staged(&archive).await;
        let metadata = uploaded?;

        info!(
            "Uploaded {} ({} bytes)",
            metadata.remote_path, metadata.size_bytes
        );
        Ok(UploadReport {
            descriptor,
            metadata,
        })
    }

    async fn upload_archive(&self, archive: &Path, remote: &str) -> StashResult<UploadMetadata> {
        self.backend.setup().await?;
        Ok(self.backend.upload(archive, remote).await?)
    }

    /// Restore a cached build into the build root
    ///
    /// When `known` is given the lineage search is skipped. Returns `None`
    /// when nothing could be resolved.
    pub async fn download_and_apply(
        &self,
        request: &CacheRequest,
        known: Option<CacheDescriptor>,
    ) -> StashResult<Option<RestoreReport>> {
        let started = Instant::now();
        let descriptor = match known {
            Some(descriptor) => descriptor,
            None => match self.resolve_cached_build(request).await? {
                Resolution::Cached(descriptor) => descriptor,
                other => {
                    debug!("Nothing to restore: {:?}", other);
                    return Ok(None);
                }
            },
        };
        let resolve = started.elapsed();

        let root = self.packager.root();
        let build_root = root.join(&self.settings.build_root);
        tokio::fs::create_dir_all(&build_root)
            .await
            .map_err(|e| StashError::io(format!("creating {}", build_root.display()), e))?;

        let staging = root.join(&self.settings.staging_dir);
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(|e| StashError::io(format!("creating {}", staging.display()), e))?;

        let extension = &self.settings.archive_extension;
        let staged = staging.join(descriptor.encode(Some(extension.as_str())));

        let started = Instant::now();
        self.backend.setup().await?;
        let downloaded = self
            .backend
            .download(&descriptor.remote_path(extension), &staged)
            .await;
        if let Err(e) = downloaded {
            // An interrupted transfer can leave a partial archive behind
            if tokio::fs::try_exists(&staged).await.unwrap_or(false) {
                remove_staged(&staged).await;
            }
            return Err(e.into());
        }
        let download = started.elapsed();

        // Entries carry the profile-scoped path, so extract at the root
        let started = Instant::now();
        let unpacked = self
            .packager
            .unpack(&staged, root, request.password())
            .await;
        remove_staged(&staged).await;
        unpacked?;
        let unpack = started.elapsed();

        info!(
            "Restored {} from {}: resolve {:.2?}, download {:.2?}, unpack {:.2?}",
            request.profile, descriptor.commit, resolve, download, unpack
        );
        Ok(Some(RestoreReport {
            descriptor,
            resolve,
            download,
            unpack,
        }))
    }

    /// Top-level policy
    ///
    /// Without a usable cache (or with `force`), compile and upload. With a
    /// cache, restore it, compile the delta to the working tree, then upload
    /// a fresh artifact for the current state.
    pub async fn decide_and_act(&self, request: &CacheRequest, force: bool) -> StashResult<RunOutcome> {
        let cached = if force {
            info!("Forced rebuild of {}", request.profile);
            None
        } else {
            match self.resolve_cached_build(request).await {
                Ok(Resolution::Cached(descriptor)) => Some(descriptor),
                Ok(_) => None,
                Err(StashError::Backend(e)) => {
                    warn!("Cache backend unavailable ({}); compiling from scratch", e);
                    None
                }
                Err(e) => return Err(e),
            }
        };

        if let Some(descriptor) = cached {
            if let Some(restore) = self.download_and_apply(request, Some(descriptor)).await? {
                let build = self.builder.compile(request.profile).await?;
                let upload = self.create_and_upload(request).await?;
                return Ok(RunOutcome::Restored {
                    restore,
                    build,
                    upload,
                });
            }
        }

        let build = self.builder.compile(request.profile).await?;
        let upload = match self.create_and_upload(request).await {
            Ok(upload) => Some(upload),
            Err(StashError::NoCommonAncestor { remote_branch }) => {
                warn!(
                    "Not uploading: no ancestor of HEAD is on {}",
                    remote_branch
                );
                None
            }
            Err(e) => return Err(e),
        };

        Ok(RunOutcome::Rebuilt { build, upload })
    }
}

async fn remove_staged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove staged archive {}: {}", path.display(), e);
    }
}
