//! # Versioning
//!
//! The collaborator contract the database uses to checkpoint mutations:
//! stage a path for addition or removal, unstage it, commit what is staged.
//! Paths handed to a collaborator are always relative to the repository
//! root.
//!
//! - [`GitCli`] drives the `git` executable.
//! - [`InMemoryVersioning`] records every call without touching disk.

mod errors;
mod git;
mod memory;

pub use errors::{VersioningError, VersioningResult};
pub use git::GitCli;
pub use memory::{CommitRecord, InMemoryVersioning, VersioningCall};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// Boxed future returned by versioning operations
pub type VersioningFuture<'a, T> =
    Pin<Box<dyn Future<Output = VersioningResult<T>> + Send + 'a>>;

/// Commit author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl Default for Author {
    fn default() -> Self {
        Self::new("gitdb", "gitdb@localhost")
    }
}

/// Version-control operations against a repository root
pub trait Versioning: Send + Sync {
    /// Stage the current content of `relative_path`
    fn stage_add<'a>(&'a self, root: &'a Path, relative_path: &'a Path)
        -> VersioningFuture<'a, ()>;

    /// Stage the removal of `relative_path`
    fn stage_remove<'a>(
        &'a self,
        root: &'a Path,
        relative_path: &'a Path,
    ) -> VersioningFuture<'a, ()>;

    /// Drop `relative_path` from the staging area
    fn unstage<'a>(&'a self, root: &'a Path, relative_path: &'a Path)
        -> VersioningFuture<'a, ()>;

    /// Commit everything staged. Returns the commit identifier.
    fn commit<'a>(
        &'a self,
        root: &'a Path,
        message: &'a str,
        author: &'a Author,
    ) -> VersioningFuture<'a, String>;
}

/// Nearest ancestor of `start` (inclusive) holding a `.git` entry
pub async fn find_repository_root(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        if tokio::fs::try_exists(dir.join(".git")).await.unwrap_or(false) {
            return Some(dir.to_path_buf());
        }
    }
    None
}
