//! Directory-tree cache backend
//!
//! Stores artifacts at `<root>/<arch>/<profile>/<name>`, mirroring the
//! remote layout. Useful on a shared mount or for a single machine.
//!
//! Lookups read a profile directory once and answer later lookups from that
//! listing until the next `setup`. A resolve walks up to a hundred
//! candidate commits, so this keeps it at one directory read instead of one
//! per commit. Artifacts added by another process during a resolve show up
//! after the next `setup`.

use crate::cache::backend::{digest_file, newest_matching, CacheBackend, UploadMetadata};
use crate::cache::key::{BuildProfile, CacheDescriptor, Platform};
use crate::error::BackendError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::fs;
use tracing::debug;

/// Artifact store rooted at a local directory
pub struct LocalBackend {
    root: PathBuf,
    platform: Platform,
    /// Directory listings keyed by search prefix, cleared by `setup`
    listings: Mutex<HashMap<String, Vec<CacheDescriptor>>>,
}

impl LocalBackend {
    /// Create a store rooted at `root` for `platform`
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
            listings: Mutex::default(),
        }
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn listings(&self) -> MutexGuard<'_, HashMap<String, Vec<CacheDescriptor>>> {
        self.listings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Artifacts under `search_prefix`, read from disk on first use
    async fn listing(&self, search_prefix: &str) -> Result<Vec<CacheDescriptor>, BackendError> {
        let cached = self.listings().get(search_prefix).cloned();
        if let Some(cached) = cached {
            return Ok(cached);
        }

        let found = self.scan(search_prefix).await?;
        self.listings()
            .insert(search_prefix.to_string(), found.clone());
        Ok(found)
    }

    fn unavailable(context: &str, path: &Path, e: std::io::Error) -> BackendError {
        BackendError::Unavailable(format!("{} {}: {}", context, path.display(), e))
    }

    /// Decoded artifacts in the directory holding `prefix`, filtered by name prefix
    async fn scan(&self, prefix: &str) -> Result<Vec<CacheDescriptor>, BackendError> {
        let (dir, name_prefix) = prefix.rsplit_once('/').unwrap_or(("", prefix));
        let dir = self.root.join(dir);

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::unavailable("reading", &dir, e)),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::unavailable("reading", &dir, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with(name_prefix) {
                continue;
            }
            match CacheDescriptor::decode(name) {
                Ok(descriptor) => found.push(descriptor),
                Err(e) => debug!("Ignoring foreign file in store: {}", e),
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl CacheBackend for LocalBackend {
    async fn setup(&self) -> Result<(), BackendError> {
        self.listings().clear();
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| BackendError::Auth(format!("cannot open store {}: {}", self.root.display(), e)))
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<UploadMetadata, BackendError> {
        let target = self.root.join(remote);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::unavailable("creating", parent, e))?;
        }

        fs::copy(local, &target)
            .await
            .map_err(|e| Self::unavailable("copying to", &target, e))?;

        let (size_bytes, sha256) = digest_file(&target)
            .await
            .map_err(|e| Self::unavailable("hashing", &target, e))?;

        self.listings()
            .retain(|prefix, _| !remote.starts_with(prefix.as_str()));

        debug!("Stored {} ({} bytes)", target.display(), size_bytes);
        Ok(UploadMetadata {
            remote_path: remote.to_string(),
            size_bytes,
            sha256,
        })
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<PathBuf, BackendError> {
        let source = self.root.join(remote);
        match fs::copy(&source, local).await {
            Ok(_) => Ok(local.to_path_buf()),
            Err(e) if e.kind() == ErrorKind::NotFound && !source.exists() => {
                Err(BackendError::NotFound)
            }
            Err(e) => Err(Self::unavailable("copying from", &source, e)),
        }
    }

    async fn fetch_by_descriptor(
        &self,
        descriptor: &CacheDescriptor,
    ) -> Result<CacheDescriptor, BackendError> {
        let candidates = self.listing(&descriptor.search_prefix()).await?;
        newest_matching(descriptor, candidates).ok_or(BackendError::NotFound)
    }

    async fn list(&self, profile: BuildProfile) -> Result<Vec<CacheDescriptor>, BackendError> {
        let template = CacheDescriptor::new(self.platform, profile, "", Utc::now());
        let prefix = template.search_prefix();
        let mut found = self.scan(&prefix).await?;
        self.listings().insert(prefix, found.clone());
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::OperatingSystem;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn linux() -> Platform {
        Platform::for_os(OperatingSystem::Linux)
    }

    async fn store_artifact(backend: &LocalBackend, work: &Path, descriptor: &CacheDescriptor) {
        let archive = work.join(descriptor.encode(Some("zip")));
        fs::write(&archive, descriptor.commit.as_bytes()).await.unwrap();
        backend
            .upload(&archive, &descriptor.remote_path("zip"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upload_uses_remote_layout() {
        let store = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let backend = LocalBackend::new(store.path(), linux());
        backend.setup().await.unwrap();

        let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        let descriptor = CacheDescriptor::new(linux(), BuildProfile::Dev, "abc123", at);
        store_artifact(&backend, work.path(), &descriptor).await;

        let expected = store
            .path()
            .join("x86_64/dev/x86_64_linux_dev_abc123_20240601083000.zip");
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn fetch_finds_newest_for_commit() {
        let store = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let backend = LocalBackend::new(store.path(), linux());

        let at = |d| Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap();
        for (commit, day) in [("abc", 1), ("abc", 3), ("def", 9)] {
            let d = CacheDescriptor::new(linux(), BuildProfile::Dev, commit, at(day));
            store_artifact(&backend, work.path(), &d).await;
        }

        let wanted = CacheDescriptor::new(linux(), BuildProfile::Dev, "abc", Utc::now());
        let found = backend.fetch_by_descriptor(&wanted).await.unwrap();
        assert_eq!(found.timestamp, at(3));
    }

    #[tokio::test]
    async fn fetch_on_empty_store_is_not_found() {
        let store = TempDir::new().unwrap();
        let backend = LocalBackend::new(store.path().join("missing"), linux());

        let wanted = CacheDescriptor::new(linux(), BuildProfile::Test, "abc", Utc::now());
        let err = backend.fetch_by_descriptor(&wanted).await.unwrap_err();
        assert_eq!(err, BackendError::NotFound);
    }

    #[tokio::test]
    async fn download_roundtrip_and_missing() {
        let store = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let backend = LocalBackend::new(store.path(), linux());

        let d = CacheDescriptor::new(linux(), BuildProfile::Dev, "abc", Utc::now());
        store_artifact(&backend, work.path(), &d).await;

        let target = work.path().join("restored.zip");
        let written = backend.download(&d.remote_path("zip"), &target).await.unwrap();
        assert_eq!(written, target);
        assert_eq!(fs::read(&target).await.unwrap(), b"abc");

        let err = backend
            .download("x86_64/dev/none.zip", &work.path().join("none.zip"))
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::NotFound);
    }

    #[tokio::test]
    async fn list_ignores_foreign_files() {
        let store = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let backend = LocalBackend::new(store.path(), linux());

        let d = CacheDescriptor::new(linux(), BuildProfile::Dev, "abc", Utc::now());
        store_artifact(&backend, work.path(), &d).await;
        fs::write(store.path().join("x86_64/dev/x86_64_linux_dev_README"), "")
            .await
            .unwrap();

        let listed = backend.list(BuildProfile::Dev).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].commit, "abc");
    }

    #[tokio::test]
    async fn lookups_reuse_one_listing_until_setup() {
        let store = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let backend = LocalBackend::new(store.path(), linux());
        backend.setup().await.unwrap();

        let first = CacheDescriptor::new(linux(), BuildProfile::Dev, "abc", Utc::now());
        store_artifact(&backend, work.path(), &first).await;
        assert!(backend.fetch_by_descriptor(&first).await.is_ok());

        // Written behind the backend's back, so the cached listing misses it
        let late = CacheDescriptor::new(linux(), BuildProfile::Dev, "def", Utc::now());
        fs::write(store.path().join(late.remote_path("zip")), b"def")
            .await
            .unwrap();
        assert_eq!(
            backend.fetch_by_descriptor(&late).await.unwrap_err(),
            BackendError::NotFound
        );

        backend.setup().await.unwrap();
        let found = backend.fetch_by_descriptor(&late).await.unwrap();
        assert_eq!(found.commit, "def");
    }

    #[tokio::test]
    async fn upload_refreshes_cached_listing() {
        let store = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let backend = LocalBackend::new(store.path(), linux());
        backend.setup().await.unwrap();

        let wanted = CacheDescriptor::new(linux(), BuildProfile::Test, "abc", Utc::now());
        assert_eq!(
            backend.fetch_by_descriptor(&wanted).await.unwrap_err(),
            BackendError::NotFound
        );

        store_artifact(&backend, work.path(), &wanted).await;
        assert_eq!(backend.fetch_by_descriptor(&wanted).await.unwrap(), wanted);
    }
}
