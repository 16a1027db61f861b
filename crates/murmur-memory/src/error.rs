//! Error types for the memory store

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the memory crate
pub type MemoryResult<T> = std::result::Result<T, MemoryError>;

/// Errors raised by storage backends and memory stores
#[derive(Error, Debug)]
pub enum MemoryError {
    /// The backing device is missing or cannot be mounted
    #[error("storage unavailable at {root}: {reason}")]
    StorageUnavailable {
        /// Mount point that was requested
        root: PathBuf,
        /// Why the mount failed
        reason: String,
    },

    /// A backing file could not be acquired
    #[error("failed to open {path}: {source}")]
    FileOpen {
        /// Device path of the file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing failed after the file was opened
    #[error("storage operation '{operation}' failed: {source}")]
    Io {
        /// Operation name
        operation: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The structured document on storage is malformed
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Device path of the document
        path: String,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// The document could not be encoded
    #[error("failed to serialize memory document: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A record cannot be framed without corrupting the log
    #[error("invalid record: {reason}")]
    InvalidRecord {
        /// What is wrong with the record
        reason: String,
    },
}

impl MemoryError {
    /// Wrap an I/O error raised by a named storage operation
    pub fn storage(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Error for a file that could not be opened
    pub fn file_open(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileOpen {
            path: path.into(),
            source,
        }
    }

    /// Error for a device that could not be mounted
    pub fn unavailable(root: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            root: root.into(),
            reason: reason.into(),
        }
    }

    /// Error for a record that cannot be framed
    pub fn invalid_record(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }

    /// Whether the error means the device itself is gone
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}
