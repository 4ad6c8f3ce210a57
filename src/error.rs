//! Database error types
//!
//! Error codes:
//! - GITDB_ALREADY_EXISTS
//! - GITDB_NOT_FOUND
//! - GITDB_COLLECTION_CLOSED
//! - GITDB_INVALID_NAME
//! - GITDB_IO_ERROR
//! - GITDB_CONFIG_ERROR
//! - store and versioning codes pass through unchanged

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::strategy::StoreError;
use crate::versioning::VersioningError;

/// Result type for database and collection operations
pub type DbResult<T> = Result<T, DbError>;

/// Errors surfaced by [`Database`](crate::Database) and
/// [`Collection`](crate::Collection)
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Versioning(#[from] VersioningError),

    #[error("Collection already exists: {0}")]
    AlreadyExists(String),

    #[error("Collection not found: {0}")]
    NotFound(String),

    #[error("Collection was deleted: {0}")]
    Closed(String),

    #[error("Invalid collection name: {0:?}")]
    InvalidName(String),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Store(e) => e.code(),
            DbError::Versioning(e) => e.code(),
            DbError::AlreadyExists(_) => "GITDB_ALREADY_EXISTS",
            DbError::NotFound(_) => "GITDB_NOT_FOUND",
            DbError::Closed(_) => "GITDB_COLLECTION_CLOSED",
            DbError::InvalidName(_) => "GITDB_INVALID_NAME",
            DbError::Io { .. } => "GITDB_IO_ERROR",
            DbError::Config(_) => "GITDB_CONFIG_ERROR",
        }
    }
}
