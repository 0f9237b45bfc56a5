//! Engine configuration: defaults, an optional TOML file, and `ASH_WIPE_*`
//! environment overrides, layered in that order.

use crate::io::IOConfig;
use crate::verification::VerifyMode;
use crate::{WipeError, WipeResult};
use anyhow::Context;
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bytes per positional write
    pub chunk_size: usize,
    pub max_write_retries: u32,
    pub retry_base_delay_ms: u64,
    pub verify_mode: VerifyMode,
    /// Where certificates are written; see [`EngineConfig::certificate_dir`]
    pub certificate_dir: Option<PathBuf>,
    /// SQLite job journal; in-memory when unset
    pub journal_path: Option<PathBuf>,
    /// PKCS#8 Ed25519 key; an ephemeral key is used when unset
    pub signing_key_path: Option<PathBuf>,
    /// Daily rolling log files are written here when set
    pub log_dir: Option<PathBuf>,
    pub log_json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let io = IOConfig::default();
        Self {
            chunk_size: io.chunk_size,
            max_write_retries: io.max_write_retries,
            retry_base_delay_ms: io.retry_base_delay.as_millis() as u64,
            verify_mode: VerifyMode::default(),
            certificate_dir: None,
            journal_path: None,
            signing_key_path: None,
            log_dir: None,
            log_json: false,
        }
    }
}

impl EngineConfig {
    pub fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("dev", "ash", "ash-wipe")
    }

    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from `path` (required) or the default location
    /// (optional), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if let Some(default) = Self::default_config_path() {
                    builder = builder.add_source(File::from(default).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ASH_WIPE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Fill unset persistence paths with per-user locations, so jobs can be
    /// resumed and certificates verified across runs.
    pub fn with_default_paths(mut self) -> Self {
        if let Some(dirs) = Self::project_dirs() {
            let data = dirs.data_dir();
            self.journal_path.get_or_insert_with(|| data.join("journal.db"));
            self.signing_key_path
                .get_or_insert_with(|| data.join("keys").join("signing.pk8"));
            self.certificate_dir
                .get_or_insert_with(|| data.join("certificates"));
        }
        self
    }

    /// Configured certificate directory, or `./certificates`.
    pub fn certificate_dir(&self) -> PathBuf {
        self.certificate_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("certificates"))
    }

    pub fn io_config(&self) -> IOConfig {
        IOConfig {
            chunk_size: self.chunk_size,
            max_write_retries: self.max_write_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            ..IOConfig::default()
        }
    }

    pub fn validate(&self) -> WipeResult<()> {
        self.io_config().validate()?;
        if self.chunk_size > 256 * 1024 * 1024 {
            return Err(WipeError::InvalidArgument(format!(
                "chunk_size {} exceeds 256 MiB",
                self.chunk_size
            )));
        }
        Ok(())
    }
}
