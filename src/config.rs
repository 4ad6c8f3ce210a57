//! Database configuration
//!
//! Loaded from a JSON file or built in code:
//!
//! ```json
//! {
//!   "root_directory": "./data",
//!   "cache_enabled": true,
//!   "auto_commit": true,
//!   "author": { "name": "ops", "email": "ops@example.com" },
//!   "versioning_timeout_ms": 10000
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};
use crate::versioning::Author;

/// Configuration of a [`Database`](crate::Database)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Directory holding one subdirectory per collection (required)
    #[serde(alias = "dbDir")]
    pub root_directory: PathBuf,

    /// Keep an in-memory mirror of every collection (default: false)
    #[serde(default, alias = "cache")]
    pub cache_enabled: bool,

    /// Stage and commit every mutation before it returns (default: false)
    #[serde(default, alias = "autoCommit")]
    pub auto_commit: bool,

    /// Repository root. Discovered from `root_directory` when absent.
    #[serde(default)]
    pub repository_root: Option<PathBuf>,

    /// Author of automatic commits
    #[serde(default)]
    pub author: Author,

    /// Upper bound for one git invocation, in milliseconds
    #[serde(default)]
    pub versioning_timeout_ms: Option<u64>,
}

impl DbConfig {
    /// Defaults for everything but the root directory
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root_directory.into(),
            cache_enabled: false,
            auto_commit: false,
            repository_root: None,
            author: Author::default(),
            versioning_timeout_ms: None,
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_auto_commit(mut self, enabled: bool) -> Self {
        self.auto_commit = enabled;
        self
    }

    pub fn with_repository_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.repository_root = Some(root.into());
        self
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.author = author;
        self
    }

    pub fn with_versioning_timeout(mut self, timeout: Duration) -> Self {
        // round up: a sub-millisecond bound must not become 0
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.versioning_timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    pub fn versioning_timeout(&self) -> Option<Duration> {
        self.versioning_timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> DbResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| DbError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let config: DbConfig = serde_json::from_str(&content)
            .map_err(|e| DbError::config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Check the values a database cannot start with
    pub fn validate(&self) -> DbResult<()> {
        if self.root_directory.as_os_str().is_empty() {
            return Err(DbError::config("root_directory must not be empty"));
        }
        if self.versioning_timeout_ms == Some(0) {
            return Err(DbError::config("versioning_timeout_ms must be > 0"));
        }
        if self.author.name.trim().is_empty() || self.author.email.trim().is_empty() {
            return Err(DbError::config("author name and email must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = DbConfig::new("/data");
        assert!(!config.cache_enabled);
        assert!(!config.auto_commit);
        assert!(config.repository_root.is_none());
        assert_eq!(config.versioning_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_minimal_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gitdb.json");
        fs::write(&path, r#"{"root_directory": "/data", "cache_enabled": true}"#).unwrap();

        let config = DbConfig::load(&path).unwrap();
        assert_eq!(config.root_directory, PathBuf::from("/data"));
        assert!(config.cache_enabled);
        assert!(!config.auto_commit);
        assert_eq!(config.author, Author::default());
    }

    #[test]
    fn test_load_accepts_camel_case_aliases() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gitdb.json");
        fs::write(&path, r#"{"dbDir": "/data", "cache": true, "autoCommit": true}"#).unwrap();

        let config = DbConfig::load(&path).unwrap();
        assert!(config.cache_enabled);
        assert!(config.auto_commit);
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gitdb.json");
        fs::write(&path, r#"{"root_directory": "/data", "versioning_timeout_ms": 0}"#).unwrap();

        let err = DbConfig::load(&path).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = DbConfig::load(Path::new("/nonexistent/gitdb.json")).unwrap_err();
        assert_eq!(err.code(), "GITDB_CONFIG_ERROR");
    }

    #[test]
    fn test_sub_millisecond_timeout_rounds_up() {
        let config = DbConfig::new("/data").with_versioning_timeout(Duration::from_micros(10));
        assert_eq!(config.versioning_timeout_ms, Some(1));
        assert!(config.validate().is_ok());

        let config = DbConfig::new("/data").with_versioning_timeout(Duration::from_micros(1500));
        assert_eq!(config.versioning_timeout(), Some(Duration::from_millis(2)));
    }

    #[test]
    fn test_builder() {
        let config = DbConfig::new("/data")
            .with_cache(true)
            .with_auto_commit(true)
            .with_repository_root("/")
            .with_versioning_timeout(Duration::from_secs(2));
        assert!(config.cache_enabled && config.auto_commit);
        assert_eq!(config.repository_root, Some(PathBuf::from("/")));
        assert_eq!(config.versioning_timeout(), Some(Duration::from_secs(2)));
    }
}
