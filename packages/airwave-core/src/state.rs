//! Core configuration types.
//!
//! [`Config`] is built once at startup and handed by value to the engines;
//! nothing in it changes while the process runs.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::protocol_constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MEDIA_DIR, DEFAULT_PACING_INTERVAL_MS, DEFAULT_PORT,
    DEFAULT_RETRY_BACKOFF_MS,
};

/// Configuration for paced playback.
///
/// Operators must pick a `chunk_size`/`pacing_interval_ms` pair that matches
/// the bitrate of their media: 4096 bytes every 150ms is roughly 218 kbit/s.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Bytes per broadcast chunk.
    pub chunk_size: usize,

    /// Wall-clock delay between broadcasts (milliseconds).
    pub pacing_interval_ms: u64,

    /// Delay before retrying after a media library failure (milliseconds).
    pub retry_backoff_ms: u64,
}

impl StreamingConfig {
    /// Creates a new `StreamingConfig` with validated values.
    ///
    /// # Errors
    ///
    /// Returns an error if any value would stall or break the scheduler.
    pub fn new(
        chunk_size: usize,
        pacing_interval_ms: u64,
        retry_backoff_ms: u64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            chunk_size,
            pacing_interval_ms,
            retry_backoff_ms,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.pacing_interval_ms == 0 {
            return Err(ConfigError::ZeroPacingInterval);
        }
        if self.retry_backoff_ms == 0 {
            return Err(ConfigError::ZeroRetryBackoff);
        }
        Ok(())
    }

    /// Returns the pacing interval as a `Duration`.
    #[must_use]
    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }

    /// Returns the retry backoff as a `Duration`.
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            pacing_interval_ms: DEFAULT_PACING_INTERVAL_MS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

/// Configuration for the Airwave core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Port for the HTTP server.
    pub port: u16,

    /// Directory holding the media library.
    pub media_dir: PathBuf,

    /// Playback pacing configuration.
    pub streaming: StreamingConfig,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.streaming.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            streaming: StreamingConfig::default(),
        }
    }
}
