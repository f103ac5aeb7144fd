//! In-memory cache backend
//!
//! Keeps artifacts in a shared map so a handle cloned before the backend is
//! boxed can still inspect what was stored and how often it was queried.
//! No network, no disk beyond the files handed to upload/download.

use crate::cache::backend::{newest_matching, CacheBackend, UploadMetadata};
use crate::cache::key::{BuildProfile, CacheDescriptor, Platform};
use crate::error::BackendError;
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Counters {
    setups: AtomicUsize,
    lookups: AtomicUsize,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
}

/// Artifact store backed by a map of remote path to bytes
#[derive(Clone)]
pub struct MemoryBackend {
    platform: Platform,
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    counters: Arc<Counters>,
    /// Lookups that fail with `Unavailable` before the store answers normally
    failing_lookups: Arc<AtomicUsize>,
    /// Downloads that write half the artifact and then fail
    truncated_downloads: Arc<AtomicUsize>,
}

impl MemoryBackend {
    /// Create an empty store for `platform`
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            objects: Arc::default(),
            counters: Arc::default(),
            failing_lookups: Arc::default(),
            truncated_downloads: Arc::default(),
        }
    }

    /// Store `contents` as the artifact named by `descriptor`
    pub fn insert(&self, descriptor: &CacheDescriptor, extension: &str, contents: &[u8]) {
        self.lock()
            .insert(descriptor.remote_path(extension), contents.to_vec());
    }

    /// Make the next `n` lookups fail as if the store were unreachable
    pub fn fail_next_lookups(&self, n: usize) {
        self.failing_lookups.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` downloads drop the connection halfway through,
    /// leaving a truncated file behind
    pub fn truncate_next_downloads(&self, n: usize) {
        self.truncated_downloads.store(n, Ordering::SeqCst);
    }

    /// Remote paths currently stored
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Number of `setup` calls
    pub fn setup_count(&self) -> usize {
        self.counters.setups.load(Ordering::SeqCst)
    }

    /// Number of `fetch_by_descriptor` calls
    pub fn lookup_count(&self) -> usize {
        self.counters.lookups.load(Ordering::SeqCst)
    }

    /// Number of `upload` calls
    pub fn upload_count(&self) -> usize {
        self.counters.uploads.load(Ordering::SeqCst)
    }

    /// Number of `download` calls
    pub fn download_count(&self) -> usize {
        self.counters.downloads.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A poisoned map only means another test thread panicked mid-insert
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn descriptors_with_prefix(&self, prefix: &str) -> Vec<CacheDescriptor> {
        self.lock()
            .keys()
            .filter(|path| path.starts_with(prefix))
            .filter_map(|path| path.rsplit('/').next())
            .filter_map(|name| CacheDescriptor::decode(name).ok())
            .collect()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn setup(&self) -> Result<(), BackendError> {
        self.counters.setups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<UploadMetadata, BackendError> {
        self.counters.uploads.fetch_add(1, Ordering::SeqCst);

        let contents = tokio::fs::read(local)
            .await
            .map_err(|e| BackendError::Unavailable(format!("reading {}: {}", local.display(), e)))?;
        let sha256 = hex::encode(Sha256::digest(&contents));
        let size_bytes = contents.len() as u64;

        self.lock().insert(remote.to_string(), contents);

        Ok(UploadMetadata {
            remote_path: remote.to_string(),
            size_bytes,
            sha256,
        })
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<PathBuf, BackendError> {
        self.counters.downloads.fetch_add(1, Ordering::SeqCst);

        let contents = self.lock().get(remote).cloned().ok_or(BackendError::NotFound)?;
        let truncate = self
            .truncated_downloads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let written = if truncate {
            &contents[..contents.len() / 2]
        } else {
            &contents[..]
        };
        tokio::fs::write(local, written)
            .await
            .map_err(|e| BackendError::Unavailable(format!("writing {}: {}", local.display(), e)))?;

        if truncate {
            return Err(BackendError::Unavailable(format!(
                "connection reset while downloading {}",
                remote
            )));
        }
        Ok(local.to_path_buf())
    }

    async fn fetch_by_descriptor(
        &self,
        descriptor: &CacheDescriptor,
    ) -> Result<CacheDescriptor, BackendError> {
        self.counters.lookups.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing_lookups.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_lookups.store(failing - 1, Ordering::SeqCst);
            return Err(BackendError::Unavailable("simulated outage".to_string()));
        }

        let candidates = self.descriptors_with_prefix(&descriptor.commit_prefix());
        newest_matching(descriptor, candidates).ok_or(BackendError::NotFound)
    }

    async fn list(&self, profile: BuildProfile) -> Result<Vec<CacheDescriptor>, BackendError> {
        let template = CacheDescriptor::new(self.platform, profile, "", Utc::now());
        let mut found = self.descriptors_with_prefix(&template.search_prefix());
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
