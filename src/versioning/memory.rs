//! # In-Memory Versioning
//!
//! A collaborator that keeps every call and commit in memory. Staged paths
//! accumulate until a commit takes them. Commits can be made to fail on
//! demand.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::{VersioningError, VersioningResult};
use super::{Author, Versioning, VersioningFuture};

/// One call received by the collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersioningCall {
    StageAdd(PathBuf),
    StageRemove(PathBuf),
    Unstage(PathBuf),
    Commit { message: String },
}

/// A commit the collaborator accepted
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub id: String,
    pub message: String,
    pub author: Author,
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub committed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<VersioningCall>,
    added: Vec<PathBuf>,
    removed: Vec<PathBuf>,
    commits: Vec<CommitRecord>,
}

/// Versioning collaborator that records instead of committing
#[derive(Debug, Default)]
pub struct InMemoryVersioning {
    state: Mutex<State>,
    reject_commits: AtomicBool,
}

impl InMemoryVersioning {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following commit fail (or succeed again)
    pub fn reject_commits(&self, reject: bool) {
        self.reject_commits.store(reject, Ordering::SeqCst);
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Every call received, in order
    pub fn calls(&self) -> Vec<VersioningCall> {
        self.with_state(|state| state.calls.clone())
    }

    /// Every accepted commit, in order
    pub fn commits(&self) -> Vec<CommitRecord> {
        self.with_state(|state| state.commits.clone())
    }

    /// Paths staged for addition and not yet committed
    pub fn staged_additions(&self) -> Vec<PathBuf> {
        self.with_state(|state| state.added.clone())
    }

    /// Paths staged for removal and not yet committed
    pub fn staged_removals(&self) -> Vec<PathBuf> {
        self.with_state(|state| state.removed.clone())
    }

    fn record_stage(&self, call: VersioningCall) {
        self.with_state(|state| {
            match &call {
                VersioningCall::StageAdd(path) => {
                    state.removed.retain(|p| p != path);
                    if !state.added.contains(path) {
                        state.added.push(path.clone());
                    }
                }
                VersioningCall::StageRemove(path) => {
                    state.added.retain(|p| p != path);
                    if !state.removed.contains(path) {
                        state.removed.push(path.clone());
                    }
                }
                VersioningCall::Unstage(path) => {
                    state.added.retain(|p| p != path);
                    state.removed.retain(|p| p != path);
                }
                VersioningCall::Commit { .. } => {}
            }
            state.calls.push(call);
        });
    }
}

impl Versioning for InMemoryVersioning {
    fn stage_add<'a>(
        &'a self,
        _root: &'a Path,
        relative_path: &'a Path,
    ) -> VersioningFuture<'a, ()> {
        self.record_stage(VersioningCall::StageAdd(relative_path.to_path_buf()));
        Box::pin(async { Ok(()) })
    }

    fn stage_remove<'a>(
        &'a self,
        _root: &'a Path,
        relative_path: &'a Path,
    ) -> VersioningFuture<'a, ()> {
        self.record_stage(VersioningCall::StageRemove(relative_path.to_path_buf()));
        Box::pin(async { Ok(()) })
    }

    fn unstage<'a>(
        &'a self,
        _root: &'a Path,
        relative_path: &'a Path,
    ) -> VersioningFuture<'a, ()> {
        self.record_stage(VersioningCall::Unstage(relative_path.to_path_buf()));
        Box::pin(async { Ok(()) })
    }

    fn commit<'a>(
        &'a self,
        _root: &'a Path,
        message: &'a str,
        author: &'a Author,
    ) -> VersioningFuture<'a, String> {
        let result: VersioningResult<String> = if self.reject_commits.load(Ordering::SeqCst) {
            Err(VersioningError::Rejected(message.to_string()))
        } else {
            Ok(self.with_state(|state| {
                let id = Uuid::new_v4().simple().to_string();
                state.calls.push(VersioningCall::Commit {
                    message: message.to_string(),
                });
                state.commits.push(CommitRecord {
                    id: id.clone(),
                    message: message.to_string(),
                    author: author.clone(),
                    added: std::mem::take(&mut state.added),
                    removed: std::mem::take(&mut state.removed),
                    committed_at: Utc::now(),
                });
                id
            }))
        };
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_takes_staged_paths() {
        let versioning = InMemoryVersioning::new();
        let root = Path::new("/repo");

        versioning.stage_add(root, Path::new("users/a.json")).await.unwrap();
        versioning.stage_remove(root, Path::new("users/b.json")).await.unwrap();
        let id = versioning
            .commit(root, "first", &Author::default())
            .await
            .unwrap();

        let commits = versioning.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].id, id);
        assert_eq!(commits[0].added, vec![PathBuf::from("users/a.json")]);
        assert_eq!(commits[0].removed, vec![PathBuf::from("users/b.json")]);
        assert!(versioning.staged_additions().is_empty());
        assert!(versioning.staged_removals().is_empty());
    }

    #[tokio::test]
    async fn test_unstage_forgets_path() {
        let versioning = InMemoryVersioning::new();
        let root = Path::new("/repo");

        versioning.stage_add(root, Path::new("a.json")).await.unwrap();
        versioning.unstage(root, Path::new("a.json")).await.unwrap();

        assert!(versioning.staged_additions().is_empty());
        assert_eq!(
            versioning.calls(),
            vec![
                VersioningCall::StageAdd(PathBuf::from("a.json")),
                VersioningCall::Unstage(PathBuf::from("a.json")),
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_commit_keeps_staging() {
        let versioning = InMemoryVersioning::new();
        let root = Path::new("/repo");
        versioning.stage_add(root, Path::new("a.json")).await.unwrap();
        versioning.reject_commits(true);

        let err = versioning
            .commit(root, "nope", &Author::default())
            .await
            .unwrap_err();

        assert!(matches!(err, VersioningError::Rejected(_)));
        assert!(versioning.commits().is_empty());
        assert_eq!(versioning.staged_additions(), vec![PathBuf::from("a.json")]);
    }
}
