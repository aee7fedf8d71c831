//! Error types for fastdl-sync
//!
//! Run-level errors (bad target directory, no enabled sources) abort a pipeline
//! run before any phase launches. Everything else is a per-item failure: it is
//! reported through the [`Journal`](crate::journal::Journal) by the component
//! that observed it and never propagates across the task runner.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fastdl-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fastdl-sync
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "target_dir")
        key: Option<String>,
    },

    /// Network transport error (DNS, connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered outside the success range for the operation
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// The URL that was requested
        url: String,
        /// The status code the server returned
        status: u16,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// bz2 stream ended in a state other than logical end-of-stream
    #[error("decompression failed for {archive}: {reason}")]
    Decompress {
        /// The archive that failed to decompress
        archive: PathBuf,
        /// The reason decompression failed
        reason: String,
    },

    /// No enabled, successfully indexed source offers the file
    #[error("no available source for {file}")]
    NoSource {
        /// The bare filename that nobody offers
        file: String,
    },

    /// Serialization error (sources.json / settings.json)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The run's cancellation switch was flipped before or during the attempt
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Shorthand for an [`Error::Config`] with a key
    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
