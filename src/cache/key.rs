//! Cache descriptors and their artifact names
//!
//! An artifact is named `<arch>_<os>_<profile>_<commit>_<YYYYMMDDHHMMSS>[.<ext>]`
//! and stored remotely under `<arch>/<profile>/<name>`. The name format is
//! shared with every other writer of the store and must not change.
//!
//! Architecture values contain the separator (`x86_64`), so names are decoded
//! from both ends: the last two segments are the timestamp and commit, and the
//! remainder must be exactly `<arch>_<os>_<profile>` for known values.

use crate::error::{StashError, StashResult};
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Separator between name fields
const SEPARATOR: char = '_';

/// Fixed-width timestamp layout
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TIMESTAMP_LEN: usize = 14;

/// Marker file that only exists on macOS
pub const DEFAULT_OS_MARKER: &str = "/System/Library/CoreServices/SystemVersion.plist";

/// CPU architecture an artifact was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "aarch64")]
    Aarch64,
}

impl Architecture {
    /// Name as it appears in artifact names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }

    /// All architectures in decode priority order
    pub fn all() -> &'static [Self] {
        &[Self::X86_64, Self::Aarch64]
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operating system an artifact was built on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Linux,
    Macos,
}

impl OperatingSystem {
    /// Name as it appears in artifact names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
        }
    }

    /// All operating systems in decode priority order
    pub fn all() -> &'static [Self] {
        &[Self::Linux, Self::Macos]
    }

    /// The single architecture assumed for this OS
    pub fn paired_architecture(&self) -> Architecture {
        match self {
            Self::Linux => Architecture::X86_64,
            Self::Macos => Architecture::Aarch64,
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build configuration that partitions the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    Dev,
    Test,
}

impl BuildProfile {
    /// Name as it appears in artifact names and build paths
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
        }
    }

    /// All profiles
    pub fn all() -> &'static [Self] {
        &[Self::Dev, Self::Test]
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BuildProfile {
    type Err = StashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| StashError::UnknownProfile(s.to_string()))
    }
}

/// Architecture and OS of the machine producing or consuming artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub arch: Architecture,
    pub os: OperatingSystem,
}

impl Platform {
    /// Platform for `os` with its paired architecture
    pub fn for_os(os: OperatingSystem) -> Self {
        Self {
            arch: os.paired_architecture(),
            os,
        }
    }

    /// Detect the platform from an OS-private marker file
    ///
    /// This is not CPU detection: if the macOS marker exists the host is
    /// assumed to be macOS on aarch64, otherwise Linux on x86_64.
    pub fn detect(marker: &Path) -> Self {
        if marker.exists() {
            Self::for_os(OperatingSystem::Macos)
        } else {
            Self::for_os(OperatingSystem::Linux)
        }
    }
}

/// Structured key of one cached build artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDescriptor {
    pub arch: Architecture,
    pub os: OperatingSystem,
    pub profile: BuildProfile,
    pub commit: String,
    /// Creation time of the artifact, whole seconds
    pub timestamp: DateTime<Utc>,
}

impl CacheDescriptor {
    /// Create a descriptor, truncating `timestamp` to whole seconds
    pub fn new(
        platform: Platform,
        profile: BuildProfile,
        commit: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            arch: platform.arch,
            os: platform.os,
            profile,
            commit: commit.into(),
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
        }
    }

    /// Platform part of the descriptor
    pub fn platform(&self) -> Platform {
        Platform {
            arch: self.arch,
            os: self.os,
        }
    }

    /// Artifact name, optionally with a `.<extension>` suffix
    pub fn encode(&self, extension: Option<&str>) -> String {
        let name = format!(
            "{}{sep}{}{sep}{}{sep}{}{sep}{}",
            self.arch,
            self.os,
            self.profile,
            self.commit,
            self.timestamp.format(TIMESTAMP_FORMAT),
            sep = SEPARATOR
        );
        match extension {
            Some(ext) => format!("{}.{}", name, ext),
            None => name,
        }
    }

    /// Parse an artifact name (with or without extension)
    pub fn decode(name: &str) -> StashResult<Self> {
        let invalid = |reason: &str| StashError::InvalidArtifactName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        // The extension starts at the first `.` after the timestamp and may
        // itself contain dots (`tar.zst`)
        let (head, tail) = name
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| invalid("missing timestamp"))?;
        let timestamp = tail.split_once('.').map_or(tail, |(stamp, _)| stamp);
        let (prefix, commit) = head
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| invalid("missing platform and profile"))?;

        if commit.is_empty() {
            return Err(invalid("empty commit"));
        }
        if timestamp.len() != TIMESTAMP_LEN || !timestamp.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("timestamp is not YYYYMMDDHHMMSS"));
        }
        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| invalid(&e.to_string()))?
            .and_utc();

        let (platform, profile) =
            parse_prefix(prefix).ok_or_else(|| invalid("unknown architecture, os or profile"))?;

        Ok(Self::new(platform, profile, commit, timestamp))
    }

    /// Remote location: `<arch>/<profile>/<name>`
    pub fn remote_path(&self, extension: &str) -> String {
        format!(
            "{}/{}/{}",
            self.arch,
            self.profile,
            self.encode(Some(extension))
        )
    }

    /// Prefix shared by every artifact of this architecture, OS and profile
    pub fn search_prefix(&self) -> String {
        format!(
            "{arch}/{profile}/{arch}{sep}{os}{sep}{profile}{sep}",
            arch = self.arch,
            os = self.os,
            profile = self.profile,
            sep = SEPARATOR
        )
    }

    /// Prefix shared by every artifact of this platform, profile and commit
    pub fn commit_prefix(&self) -> String {
        format!("{}{}{}", self.search_prefix(), self.commit, SEPARATOR)
    }

    /// Whether `other` is an artifact for the same platform, profile and commit
    pub fn same_build(&self, other: &CacheDescriptor) -> bool {
        self.arch == other.arch
            && self.os == other.os
            && self.profile == other.profile
            && self.commit == other.commit
    }
}

/// Match `<arch>_<os>_<profile>` exactly against the known values
fn parse_prefix(prefix: &str) -> Option<(Platform, BuildProfile)> {
    for arch in Architecture::all() {
        let Some(rest) = strip_field(prefix, arch.as_str()) else {
            continue;
        };
        for os in OperatingSystem::all() {
            let Some(profile) = strip_field(rest, os.as_str()) else {
                continue;
            };
            if let Ok(profile) = profile.parse() {
                return Some((Platform { arch: *arch, os: *os }, profile));
            }
        }
    }
    None
}

fn strip_field<'a>(s: &'a str, field: &str) -> Option<&'a str> {
    s.strip_prefix(field)?.strip_prefix(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn linux() -> Platform {
        Platform::for_os(OperatingSystem::Linux)
    }

    fn sample() -> CacheDescriptor {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 17, 4, 5).unwrap();
        CacheDescriptor::new(linux(), BuildProfile::Dev, "abc123", ts)
    }

    #[test]
    fn encode_layout() {
        assert_eq!(sample().encode(None), "x86_64_linux_dev_abc123_20240309170405");
        assert_eq!(
            sample().encode(Some("zip")),
            "x86_64_linux_dev_abc123_20240309170405.zip"
        );
    }

    #[test]
    fn roundtrip_truncates_to_seconds() {
        let now = Utc::now();
        let original = CacheDescriptor::new(linux(), BuildProfile::Dev, "abc123", now);
        let decoded = CacheDescriptor::decode(&original.encode(None)).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(decoded.arch, Architecture::X86_64);
        assert_eq!(decoded.os, OperatingSystem::Linux);
        assert_eq!(decoded.profile, BuildProfile::Dev);
        assert_eq!(decoded.commit, "abc123");
        assert_eq!(decoded.timestamp.timestamp(), now.timestamp());
        assert_eq!(decoded.timestamp.nanosecond(), 0);
    }

    #[test]
    fn roundtrip_with_extension() {
        let original = sample();
        let decoded = CacheDescriptor::decode(&original.encode(Some("zip"))).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn roundtrip_with_multi_dot_extension() {
        let original = sample();
        let name = original.encode(Some("tar.zst"));
        assert_eq!(name, "x86_64_linux_dev_abc123_20240309170405.tar.zst");
        assert_eq!(CacheDescriptor::decode(&name).unwrap(), original);
        assert_eq!(
            CacheDescriptor::decode(original.remote_path("tar.zst").rsplit('/').next().unwrap())
                .unwrap(),
            original
        );
    }

    #[test]
    fn roundtrip_macos_test_profile() {
        let ts = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
        let original = CacheDescriptor::new(
            Platform::for_os(OperatingSystem::Macos),
            BuildProfile::Test,
            "0123456789abcdef0123456789abcdef01234567",
            ts,
        );
        let name = original.encode(Some("zip"));
        assert_eq!(
            name,
            "aarch64_macos_test_0123456789abcdef0123456789abcdef01234567_19991231235959.zip"
        );
        assert_eq!(CacheDescriptor::decode(&name).unwrap(), original);
    }

    #[test]
    fn decode_commit_containing_enum_tokens() {
        // A commit that happens to contain profile and os names is taken by position
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let original = CacheDescriptor::new(
            Platform::for_os(OperatingSystem::Macos),
            BuildProfile::Test,
            "dev0linux",
            ts,
        );
        assert_eq!(CacheDescriptor::decode(&original.encode(None)).unwrap(), original);
    }

    #[test]
    fn decode_rejects_bad_timestamp() {
        assert!(CacheDescriptor::decode("x86_64_linux_dev_abc123_2024").is_err());
        assert!(CacheDescriptor::decode("x86_64_linux_dev_abc123_2024130917040x").is_err());
        assert!(CacheDescriptor::decode("x86_64_linux_dev_abc123_20241309170405").is_err());
    }

    #[test]
    fn decode_rejects_unknown_fields() {
        assert!(CacheDescriptor::decode("riscv_linux_dev_abc123_20240309170405").is_err());
        assert!(CacheDescriptor::decode("x86_64_windows_dev_abc123_20240309170405").is_err());
        assert!(CacheDescriptor::decode("x86_64_linux_prod_abc123_20240309170405").is_err());
        assert!(CacheDescriptor::decode("x86_64_linux_dev_extra_abc123_20240309170405").is_err());
    }

    #[test]
    fn decode_rejects_short_names() {
        assert!(CacheDescriptor::decode("abc123_20240309170405").is_err());
        assert!(CacheDescriptor::decode("").is_err());
    }

    #[test]
    fn remote_path_and_prefix() {
        let d = sample();
        assert_eq!(
            d.remote_path("zip"),
            "x86_64/dev/x86_64_linux_dev_abc123_20240309170405.zip"
        );
        assert_eq!(d.search_prefix(), "x86_64/dev/x86_64_linux_dev_");
        assert_eq!(d.commit_prefix(), "x86_64/dev/x86_64_linux_dev_abc123_");
        assert!(d.remote_path("zip").starts_with(&d.search_prefix()));
    }

    #[test]
    fn same_build_ignores_timestamp() {
        let a = sample();
        let b = CacheDescriptor::new(linux(), BuildProfile::Dev, "abc123", Utc::now());
        let c = CacheDescriptor::new(linux(), BuildProfile::Test, "abc123", Utc::now());
        assert!(a.same_build(&b));
        assert!(!a.same_build(&c));
    }

    #[test]
    fn profile_from_str() {
        assert_eq!("dev".parse::<BuildProfile>().unwrap(), BuildProfile::Dev);
        assert_eq!("test".parse::<BuildProfile>().unwrap(), BuildProfile::Test);
        assert!("Dev".parse::<BuildProfile>().is_err());
    }

    #[test]
    fn platform_pairing() {
        assert_eq!(linux().arch, Architecture::X86_64);
        assert_eq!(
            Platform::for_os(OperatingSystem::Macos).arch,
            Architecture::Aarch64
        );
    }

    #[test]
    fn platform_detect_uses_marker() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("SystemVersion.plist");

        assert_eq!(Platform::detect(&marker).os, OperatingSystem::Linux);

        std::fs::write(&marker, "<plist/>").unwrap();
        let detected = Platform::detect(&marker);
        assert_eq!(detected.os, OperatingSystem::Macos);
        assert_eq!(detected.arch, Architecture::Aarch64);
    }
}
