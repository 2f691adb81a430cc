//! Centralized error types for mimeentity.
//!
//! Decoding never fails on malformed content: unknown charsets, broken
//! encoded words and bad ranges all degrade to a best-effort value. The only
//! errors that surface are genuine I/O failures on the backing store and
//! failures in the surrounding adapters (structure splitting, config).

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mimeentity library.
#[derive(Error, Debug)]
pub enum EntityError {
    /// I/O error while reading the backing store.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified message file does not exist.
    #[error("Message file not found: {0}")]
    FileNotFound(PathBuf),

    /// The structural parser could not split the message into parts.
    #[error("Could not split message into parts: {0}")]
    Structure(String),

    /// The configuration file could not be used.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `Result<T, EntityError>`.
pub type Result<T> = std::result::Result<T, EntityError>;

impl EntityError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` if this error came from the backing store rather than an adapter.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::FileNotFound(_))
    }
}

/// Allow `?` on `std::io::Error` for in-memory or anonymous streams, where
/// there is no path to report.
impl From<std::io::Error> for EntityError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<stream>"),
            source,
        }
    }
}
