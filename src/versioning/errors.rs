//! # Versioning Errors

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for versioning operations
pub type VersioningResult<T> = Result<T, VersioningError>;

/// Errors raised by a versioning collaborator
#[derive(Debug, Error)]
pub enum VersioningError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("`{command}` timed out after {}ms", .after.as_millis())]
    Timeout { command: String, after: Duration },

    #[error("Path is outside the repository: {}", .0.display())]
    OutsideRepository(PathBuf),

    #[error("Commit rejected: {0}")]
    Rejected(String),
}

impl VersioningError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            VersioningError::Spawn { .. } => "GITDB_VERSIONING_SPAWN_FAILED",
            VersioningError::CommandFailed { .. } => "GITDB_VERSIONING_COMMAND_FAILED",
            VersioningError::Timeout { .. } => "GITDB_VERSIONING_TIMEOUT",
            VersioningError::OutsideRepository(_) => "GITDB_OUTSIDE_REPOSITORY",
            VersioningError::Rejected(_) => "GITDB_COMMIT_REJECTED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = VersioningError::Timeout {
            command: "git commit".into(),
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "`git commit` timed out after 250ms");
        assert_eq!(err.code(), "GITDB_VERSIONING_TIMEOUT");
    }

    #[test]
    fn test_outside_repository_display() {
        let err = VersioningError::OutsideRepository(PathBuf::from("/elsewhere/a.json"));
        assert!(err.to_string().contains("/elsewhere/a.json"));
    }
}
