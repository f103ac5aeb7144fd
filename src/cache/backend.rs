//! Cache backend abstraction
//!
//! Provides a trait for artifact storage that can be implemented by different
//! stores (a local directory tree, object storage, an in-memory fake).

use crate::cache::key::{BuildProfile, CacheDescriptor};
use crate::error::BackendError;
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, BufReader};

/// What the store recorded for an uploaded artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadMetadata {
    /// Where the artifact now lives in the store
    pub remote_path: String,
    /// Size of the uploaded archive
    pub size_bytes: u64,
    /// SHA-256 of the uploaded archive (hex)
    pub sha256: String,
}

/// Abstract artifact store
///
/// Lookups distinguish `BackendError::NotFound` (the artifact definitely does
/// not exist) from other errors (the store could not be asked).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Authenticate or open a session. Safe to call more than once.
    async fn setup(&self) -> Result<(), BackendError>;

    /// Store the file at `local` under `remote`
    async fn upload(&self, local: &Path, remote: &str) -> Result<UploadMetadata, BackendError>;

    /// Fetch `remote` into `local`, returning the written path
    async fn download(&self, remote: &str, local: &Path) -> Result<PathBuf, BackendError>;

    /// Find the newest artifact for the descriptor's platform, profile and
    /// commit. The descriptor's own timestamp is ignored.
    async fn fetch_by_descriptor(
        &self,
        descriptor: &CacheDescriptor,
    ) -> Result<CacheDescriptor, BackendError>;

    /// All artifacts of this backend's platform for `profile`, newest first
    async fn list(&self, profile: BuildProfile) -> Result<Vec<CacheDescriptor>, BackendError>;

    /// Human-readable backend name for display
    fn backend_name(&self) -> &'static str;
}

const DIGEST_CHUNK: usize = 64 * 1024;

/// Size and SHA-256 digest of a file's contents, read in fixed-size chunks
pub async fn digest_file(path: &Path) -> std::io::Result<(u64, String)> {
    let file = tokio::fs::File::open(path).await?;
    let mut reader = BufReader::with_capacity(DIGEST_CHUNK, file);
    let mut buf = vec![0u8; DIGEST_CHUNK];

    let mut hasher = Sha256::new();
    let mut size = 0u64;
    loop {
        let read = reader.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
        size += read as u64;
    }

    Ok((size, hex::encode(hasher.finalize())))
}

/// Newest descriptor among `candidates` that matches `wanted`'s build
pub(crate) fn newest_matching(
    wanted: &CacheDescriptor,
    candidates: impl IntoIterator<Item = CacheDescriptor>,
) -> Option<CacheDescriptor> {
    candidates
        .into_iter()
        .filter(|c| wanted.same_build(c))
        .max_by_key(|c| c.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::{OperatingSystem, Platform};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[tokio::test]
    async fn digest_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artifact.zip");
        tokio::fs::write(&path, b"abc").await.unwrap();

        let (size, digest) = digest_file(&path).await.unwrap();
        assert_eq!(size, 3);
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn digest_spans_several_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("large.zip");
        let contents: Vec<u8> = (0..DIGEST_CHUNK * 3 + 17).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(&path, &contents).await.unwrap();

        let (size, digest) = digest_file(&path).await.unwrap();
        assert_eq!(size, contents.len() as u64);
        assert_eq!(digest, hex::encode(Sha256::digest(&contents)));
    }

    #[tokio::test]
    async fn digest_of_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(digest_file(&dir.path().join("absent.zip")).await.is_err());
    }

    #[test]
    fn newest_matching_picks_latest_timestamp() {
        let platform = Platform::for_os(OperatingSystem::Linux);
        let at = |h| Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap();
        let wanted = CacheDescriptor::new(platform, BuildProfile::Dev, "abc", at(0));

        let candidates = vec![
            CacheDescriptor::new(platform, BuildProfile::Dev, "abc", at(3)),
            CacheDescriptor::new(platform, BuildProfile::Dev, "abc", at(9)),
            CacheDescriptor::new(platform, BuildProfile::Dev, "def", at(12)),
            CacheDescriptor::new(platform, BuildProfile::Test, "abc", at(15)),
        ];

        let found = newest_matching(&wanted, candidates).unwrap();
        assert_eq!(found.timestamp, at(9));
    }
}
