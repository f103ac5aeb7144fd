//! Configuration management for buildstash

pub mod schema;

pub use schema::Config;

use crate::cache::key::Platform;
use crate::error::{StashError, StashResult};
use schema::{BackendConfig, PlatformConfig};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Project-local configuration file name
pub const LOCAL_CONFIG_FILE: &str = ".buildstash.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("buildstash")
            .join("config.toml")
    }

    /// Get the default local store path
    pub fn default_store_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("buildstash")
            .join("store")
    }

    /// Find `.buildstash.toml` in `start` or any of its ancestors
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> StashResult<Config> {
        let value = self.load_table(&self.config_path).await?;
        Self::into_config(&self.config_path, value)
    }

    /// Load global configuration with a project-local file layered on top
    ///
    /// Tables are merged key by key; any value set locally wins.
    pub async fn load_merged(&self, local: Option<&Path>) -> StashResult<Config> {
        let mut merged = self.load_table(&self.config_path).await?;

        if let Some(local) = local {
            debug!("Merging local config {}", local.display());
            let overlay = self.load_table(local).await?;
            merge_tables(&mut merged, overlay);
            return Self::into_config(local, merged);
        }

        Self::into_config(&self.config_path, merged)
    }

    /// Read a TOML file as a raw table; a missing file is an empty table
    async fn load_table(&self, path: &Path) -> StashResult<toml::Table> {
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(toml::Table::new());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| StashError::io(format!("reading config from {}", path.display()), e))?;

        content
            .parse::<toml::Table>()
            .map_err(|e| StashError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn into_config(path: &Path, table: toml::Table) -> StashResult<Config> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| StashError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformConfig {
    /// Platform from overrides, falling back to marker-file detection
    pub fn resolve(&self) -> Platform {
        let os = self
            .os
            .unwrap_or_else(|| Platform::detect(&self.marker_file).os);
        Platform {
            arch: self.arch.unwrap_or_else(|| os.paired_architecture()),
            os,
        }
    }
}

impl BackendConfig {
    /// Root of the local store
    pub fn store_dir(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(ConfigManager::default_store_dir)
    }
}

/// Recursively merge `overlay` into `base`
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
