//! Centralized error types for the Airwave core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps API errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and API responses.
    fn code(&self) -> &'static str;
}

/// Invalid startup configuration. Fatal: the process does not start.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk_size must be >= 1")]
    ZeroChunkSize,

    #[error("pacing_interval_ms must be >= 1")]
    ZeroPacingInterval,

    #[error("retry_backoff_ms must be >= 1")]
    ZeroRetryBackoff,
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ZeroChunkSize => "zero_chunk_size",
            Self::ZeroPacingInterval => "zero_pacing_interval",
            Self::ZeroRetryBackoff => "zero_retry_backoff",
        }
    }
}

/// Track selection failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// The library listing contained no tracks.
    #[error("media library is empty")]
    EmptyLibrary,
}

/// Media library failure. Always recoverable: the scheduler abandons the
/// current iteration and tries again.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The library container could not be listed.
    #[error("cannot list media library {path}: {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A track could not be read.
    #[error("cannot read track {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No track to choose from.
    #[error("media library has no tracks")]
    Empty,
}

impl ErrorCode for LibraryError {
    fn code(&self) -> &'static str {
        match self {
            Self::ListFailed { .. } => "library_list_failed",
            Self::ReadFailed { .. } => "track_read_failed",
            Self::Empty => "library_empty",
        }
    }
}

impl From<SelectionError> for LibraryError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::EmptyLibrary => Self::Empty,
        }
    }
}

/// Application-wide error type for the Airwave API layer.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AirwaveError {
    /// Server configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AirwaveError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type AirwaveResult<T> = Result<T, AirwaveError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for AirwaveError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for AirwaveError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
