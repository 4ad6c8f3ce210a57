//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code.

use std::fmt;
use std::io;

use crate::error::DbError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// I/O error (stdin/stdout)
    IoError,
    /// Malformed command input
    InvalidInput,
    /// Named collection is not registered
    UnknownCollection,
    /// Failure reported by the database, carrying its code
    Database(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::IoError => "GITDB_CLI_IO_ERROR",
            Self::InvalidInput => "GITDB_CLI_INVALID_INPUT",
            Self::UnknownCollection => "GITDB_CLI_UNKNOWN_COLLECTION",
            Self::Database(code) => *code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Invalid input
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    /// Unknown collection
    pub fn unknown_collection(name: &str) -> Self {
        Self::new(
            CliErrorCode::UnknownCollection,
            format!("No collection named '{}'. Run 'gitdb create {}' first.", name, name),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON error: {}", e))
    }
}

impl From<DbError> for CliError {
    fn from(e: DbError) -> Self {
        Self::new(CliErrorCode::Database(e.code()), e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_codes_pass_through() {
        let err: CliError = DbError::NotFound("users".into()).into();
        assert_eq!(err.code_str(), "GITDB_NOT_FOUND");
        assert_eq!(err.to_string(), "GITDB_NOT_FOUND: Collection not found: users");
    }

    #[test]
    fn test_json_errors_are_invalid_input() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CliError = parse.into();
        assert_eq!(err.code(), &CliErrorCode::InvalidInput);
    }
}
