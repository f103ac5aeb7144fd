//! Build directory packaging
//!
//! Artifacts are transient, so archives are stored uncompressed: packing
//! speed matters more than size. The external tool sits behind
//! [`ArchiveTool`]; [`ArchivePackager`] owns the path checks that apply to
//! every tool.

use crate::error::{StashError, StashResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// External archiver
#[async_trait]
pub trait ArchiveTool: Send + Sync {
    /// Archive `directory` (relative to `root`) into `archive`
    async fn pack(
        &self,
        root: &Path,
        directory: &Path,
        archive: &Path,
        password: Option<&str>,
    ) -> StashResult<()>;

    /// Extract `archive` into `target`
    async fn unpack(&self, archive: &Path, target: &Path, password: Option<&str>)
        -> StashResult<()>;
}

/// `zip`/`unzip` in store-only mode
pub struct ZipTool;

impl ZipTool {
    /// Create a zip tool
    pub fn new() -> Self {
        Self
    }

    async fn exec(program: &str, args: &[String], cwd: Option<&Path>) -> StashResult<()> {
        // Never log the password argument
        let shown: Vec<&str> = args
            .iter()
            .scan(false, |after_p, arg| {
                let masked = if *after_p { "***" } else { arg.as_str() };
                *after_p = arg == "-P";
                Some(masked)
            })
            .collect();
        let command = format!("{} {}", program, shown.join(" "));
        debug!("Executing: {}", command);

        let mut cmd = Command::new(program);
        cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| StashError::command_failed(command.clone(), e))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            Err(StashError::Archive {
                command,
                stderr: detail.trim().to_string(),
            })
        }
    }
}

impl Default for ZipTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArchiveTool for ZipTool {
    async fn pack(
        &self,
        root: &Path,
        directory: &Path,
        archive: &Path,
        password: Option<&str>,
    ) -> StashResult<()> {
        // -0: store only, -r: recurse, -q: quiet
        let mut args = vec!["-0".to_string(), "-r".to_string(), "-q".to_string()];
        if let Some(password) = password {
            args.push("-P".to_string());
            args.push(password.to_string());
        }
        args.push(archive.display().to_string());
        args.push(directory.display().to_string());

        Self::exec("zip", &args, Some(root)).await
    }

    async fn unpack(
        &self,
        archive: &Path,
        target: &Path,
        password: Option<&str>,
    ) -> StashResult<()> {
        // -o: overwrite without prompting
        let mut args = vec!["-o".to_string(), "-q".to_string()];
        if let Some(password) = password {
            args.push("-P".to_string());
            args.push(password.to_string());
        }
        args.push(archive.display().to_string());
        args.push("-d".to_string());
        args.push(target.display().to_string());

        Self::exec("unzip", &args, None).await
    }
}

/// Packs and restores build directories relative to a repository root
pub struct ArchivePackager {
    root: PathBuf,
    tool: Box<dyn ArchiveTool>,
}

impl ArchivePackager {
    /// Create a packager working inside `root`
    pub fn new(root: impl Into<PathBuf>, tool: Box<dyn ArchiveTool>) -> Self {
        Self {
            root: root.into(),
            tool,
        }
    }

    /// Repository root archives are relative to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Archive `directory` (relative to the root) into `archive`
    ///
    /// Entries keep their root-relative paths, so unpacking at the root
    /// restores the directory in place.
    pub async fn pack(
        &self,
        directory: &Path,
        archive: &Path,
        password: Option<&str>,
    ) -> StashResult<PathBuf> {
        let source = self.root.join(directory);
        if !source.is_dir() {
            return Err(StashError::precondition(format!(
                "Directory to archive not found: {}",
                source.display()
            )));
        }

        let archive = self.root.join(archive);
        if let Some(parent) = archive.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StashError::io(format!("creating {}", parent.display()), e))?;
        }

        self.tool
            .pack(&self.root, directory, &archive, password)
            .await?;

        info!("Packed {} into {}", directory.display(), archive.display());
        Ok(archive)
    }

    /// Extract `archive` into `target`
    pub async fn unpack(
        &self,
        archive: &Path,
        target: &Path,
        password: Option<&str>,
    ) -> StashResult<()> {
        let archive = self.root.join(archive);
        if !archive.is_file() {
            return Err(StashError::precondition(format!(
                "Archive not found: {}",
                archive.display()
            )));
        }

        let target = self.root.join(target);
        if !target.is_dir() {
            return Err(StashError::precondition(format!(
                "Unpack target not found: {}",
                target.display()
            )));
        }

        self.tool.unpack(&archive, &target, password).await?;

        info!("Unpacked {} into {}", archive.display(), target.display());
        Ok(())
    }
}

/// Archive tool that records directory names instead of contents
///
/// `pack` writes the archived directory path into the archive file; `unpack`
/// recreates that directory with a `restored` marker inside.
#[cfg(test)]
pub(crate) struct RecordingTool {
    pub fail: bool,
    pub passwords: std::sync::Arc<std::sync::Mutex<Vec<Option<String>>>>,
}

#[cfg(test)]
impl RecordingTool {
    pub fn new() -> Self {
        Self {
            fail: false,
            passwords: Default::default(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ArchiveTool for RecordingTool {
    async fn pack(
        &self,
        _root: &Path,
        directory: &Path,
        archive: &Path,
        password: Option<&str>,
    ) -> StashResult<()> {
        self.passwords
            .lock()
            .unwrap()
            .push(password.map(str::to_string));
        if self.fail {
            return Err(StashError::Archive {
                command: "zip".to_string(),
                stderr: "zip error: Nothing to do!".to_string(),
            });
        }
        tokio::fs::write(archive, directory.display().to_string())
            .await
            .map_err(|e| StashError::io("writing archive", e))
    }

    async fn unpack(
        &self,
        archive: &Path,
        target: &Path,
        password: Option<&str>,
    ) -> StashResult<()> {
        self.passwords
            .lock()
            .unwrap()
            .push(password.map(str::to_string));
        if self.fail {
            return Err(StashError::Archive {
                command: "unzip".to_string(),
                stderr: "incorrect password".to_string(),
            });
        }
        let directory = tokio::fs::read_to_string(archive)
            .await
            .map_err(|e| StashError::io("reading archive", e))?;
        let restored = target.join(directory.trim());
        tokio::fs::create_dir_all(&restored)
            .await
            .map_err(|e| StashError::io("restoring", e))?;
        tokio::fs::write(restored.join("restored"), b"")
            .await
            .map_err(|e| StashError::io("restoring", e))
    }
}
