//! Server configuration.
//!
//! Supports loading from a YAML file; CLI flags and their environment
//! variables (see `main.rs`) override individual values.

use std::path::{Path, PathBuf};

use airwave_core::protocol_constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MEDIA_DIR, DEFAULT_PACING_INTERVAL_MS, DEFAULT_PORT,
    DEFAULT_RETRY_BACKOFF_MS,
};
use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to.
    /// Override: `AIRWAVE_PORT`
    pub port: u16,

    /// Directory whose files are broadcast.
    /// Override: `AIRWAVE_MEDIA_DIR`
    pub media_dir: PathBuf,

    /// Bytes per broadcast chunk.
    /// Override: `AIRWAVE_CHUNK_SIZE`
    pub chunk_size: usize,

    /// Delay between chunks in milliseconds.
    /// Override: `AIRWAVE_PACING_MS`
    pub pacing_interval_ms: u64,

    /// Delay before retrying after a media library failure, in milliseconds.
    /// Override: `AIRWAVE_RETRY_BACKOFF_MS`
    pub retry_backoff_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            chunk_size: DEFAULT_CHUNK_SIZE,
            pacing_interval_ms: DEFAULT_PACING_INTERVAL_MS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Converts to airwave-core's validated Config type.
    pub fn to_core_config(&self) -> Result<airwave_core::Config> {
        let streaming = airwave_core::StreamingConfig::new(
            self.chunk_size,
            self.pacing_interval_ms,
            self.retry_backoff_ms,
        )
        .context("Invalid streaming configuration")?;

        Ok(airwave_core::Config {
            port: self.port,
            media_dir: self.media_dir.clone(),
            streaming,
        })
    }
}
