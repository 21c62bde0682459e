//! Error handling for STDF processing operations.
//!
//! Provides error types with context for decoding, identity resolution,
//! configuration and output failures. Per-record data problems are not
//! errors: they are recovered locally with documented defaults.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input not found at path: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Failed to decode STDF file: {path} - {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Invalid identity baseline: {message}")]
    Baseline { message: String },

    #[error("Identity space exhausted for {namespace} namespace")]
    IdentityExhausted { namespace: &'static str },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to write output: {path} - {reason}")]
    OutputFailed { path: PathBuf, reason: String },
}

impl StdfError {
    /// Create a baseline error
    pub fn baseline(message: impl Into<String>) -> Self {
        Self::Baseline {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StdfError>;
