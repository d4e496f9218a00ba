use std::path::{Path, PathBuf};

use serde::Deserialize;
use sitedeploy_archive::ExtractOptions;

use crate::error::ConfigError;

const DEFAULT_MAX_SIZE_MB: u64 = 2;
const MIB: u64 = 1024 * 1024;

/// Deployer settings, usually read from a TOML file:
///
/// ```toml
/// max_size_mb = 16
/// dir_mode = 0o750
/// lock_file = "/run/sitedeploy.lock"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployerConfig {
    /// Largest accepted payload in MiB. `0` means the default.
    pub max_size_mb: u64,
    /// Mode for missing parent directories of a target.
    pub dir_mode: u32,
    /// Mode for the staging root and for directories a tar implies.
    pub extract_dir_mode: u32,
    /// Mode of a staged single file.
    pub file_mode: u32,
    /// Advisory lock file shared with other deployer processes.
    pub lock_file: Option<PathBuf>,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            dir_mode: 0o750,
            extract_dir_mode: 0o755,
            file_mode: 0o644,
            lock_file: None,
        }
    }
}

impl DeployerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        Ok(config.normalized())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn max_size_mb(mut self, mb: u64) -> Self {
        self.max_size_mb = mb;
        self.normalized()
    }

    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    pub fn extract_dir_mode(mut self, mode: u32) -> Self {
        self.extract_dir_mode = mode;
        self
    }

    pub fn file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn lock_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file = Some(path.into());
        self
    }

    /// Payload limit in bytes.
    pub fn max_bytes(&self) -> u64 {
        let mb = if self.max_size_mb == 0 {
            DEFAULT_MAX_SIZE_MB
        } else {
            self.max_size_mb
        };
        mb.saturating_mul(MIB)
    }

    pub(crate) fn extract_options(&self) -> ExtractOptions {
        ExtractOptions::new()
            .dir_mode(self.extract_dir_mode)
            .file_mode(self.file_mode)
    }

    fn normalized(mut self) -> Self {
        if self.max_size_mb == 0 {
            self.max_size_mb = DEFAULT_MAX_SIZE_MB;
        }
        self
    }
}
