//! # Store Errors

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for strategy operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the durable store and the cache mirror
#[derive(Debug, Error)]
pub enum StoreError {
    /// Directory or file could not be read, listed or removed
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A record file exists but does not hold a valid record
    #[error("Corrupt record at {}: {reason}", .path.display())]
    CorruptRecord { path: PathBuf, reason: String },

    /// Serializing or writing a record file failed
    #[error("Write failed at {}: {reason}", .path.display())]
    WriteFailed { path: PathBuf, reason: String },

    /// The record cannot be stored at all
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn write_failed(path: &Path, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Io { .. } => "GITDB_STORE_IO_ERROR",
            StoreError::CorruptRecord { .. } => "GITDB_CORRUPT_RECORD",
            StoreError::WriteFailed { .. } => "GITDB_WRITE_FAILED",
            StoreError::InvalidRecord(_) => "GITDB_INVALID_RECORD",
        }
    }

    /// The file the error is about, when there is one
    pub fn path(&self) -> Option<&Path> {
        match self {
            StoreError::Io { path, .. }
            | StoreError::CorruptRecord { path, .. }
            | StoreError::WriteFailed { path, .. } => Some(path),
            StoreError::InvalidRecord(_) => None,
        }
    }
}
