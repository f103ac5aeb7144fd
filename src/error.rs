//! Error types for buildstash
//!
//! All modules use `StashResult<T>` as their return type. Backend lookups
//! carry their own `BackendError` so "definitely absent" can be told apart
//! from "could not check".

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buildstash operations
pub type StashResult<T> = Result<T, StashError>;

/// All errors that can occur in buildstash
#[derive(Error, Debug)]
pub enum StashError {
    // Precondition errors
    #[error("Build directory not found: {0}")]
    BuildDirMissing(PathBuf),

    #[error("{message} (cwd: {cwd})")]
    Precondition { message: String, cwd: String },

    #[error("No ancestor of HEAD is contained in {remote_branch}")]
    NoCommonAncestor { remote_branch: String },

    // Version control errors
    #[error("Version control query failed: {command}: {stderr}")]
    Vcs { command: String, stderr: String },

    #[error("Unexpected version control output from {command}: {output}")]
    VcsOutput { command: String, output: String },

    // Cache key errors
    #[error("Invalid artifact name {name}: {reason}")]
    InvalidArtifactName { name: String, reason: String },

    #[error("Unknown build profile: {0}")]
    UnknownProfile(String),

    // Backend errors
    #[error("Cache backend error: {0}")]
    Backend(#[from] BackendError),

    // Archive errors
    #[error("Archive command failed: {command}: {stderr}")]
    Archive { command: String, stderr: String },

    // Build errors
    #[error("Build failed: {detail}")]
    BuildFailed { detail: String },

    #[error("No build command configured")]
    BuildNotConfigured,

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Errors reported by a cache backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The requested artifact definitely does not exist
    #[error("artifact not found")]
    NotFound,

    /// The backend could not be reached or refused the request
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Authentication or session setup failed
    #[error("backend authentication failed: {0}")]
    Auth(String),
}

impl BackendError {
    /// Whether a lookup that failed this way is worth repeating
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl StashError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a version control failure from a command and its stderr
    pub fn vcs(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Vcs {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a precondition failure, recording the current working directory
    pub fn precondition(message: impl Into<String>) -> Self {
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        Self::Precondition {
            message: message.into(),
            cwd,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Vcs { .. } => Some("Run buildstash from inside a git checkout"),
            Self::NoCommonAncestor { .. } => {
                Some("Fetch the remote branch first: git fetch origin")
            }
            Self::BuildDirMissing(_) => Some("Compile the profile before uploading"),
            Self::BuildNotConfigured => Some("Set build.command in config.toml"),
            Self::Backend(BackendError::Auth(_)) => Some("Check the backend credentials"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StashError::vcs("git rev-list --count HEAD", "not a git repository");
        assert!(err.to_string().contains("not a git repository"));
    }

    #[test]
    fn precondition_includes_cwd() {
        let err = StashError::precondition("Archive not found: a.zip");
        let text = err.to_string();
        assert!(text.contains("Archive not found: a.zip"));
        assert!(text.contains("cwd:"));
    }

    #[test]
    fn error_hint() {
        let err = StashError::BuildDirMissing(PathBuf::from("_build/dev"));
        assert_eq!(err.hint(), Some("Compile the profile before uploading"));
    }

    #[test]
    fn backend_transience() {
        assert!(BackendError::Unavailable("timeout".into()).is_transient());
        assert!(!BackendError::NotFound.is_transient());
        assert!(!BackendError::Auth("expired".into()).is_transient());
    }
}
