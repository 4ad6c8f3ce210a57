//! # Repository
//!
//! The database's view of the enclosing version-control repository. It
//! turns absolute record paths into repository-relative ones, remembers what
//! was staged since the last commit, and serializes stage-then-commit
//! sequences so one commit carries exactly the paths of one operation.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::versioning::{Author, Versioning, VersioningError, VersioningResult};

/// Kind of staging a mutation needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// The file exists and its content changed
    Add,
    /// The file was removed
    Remove,
}

/// Shared handle on the repository holding the database
pub struct Repository {
    root: PathBuf,
    versioning: Arc<dyn Versioning>,
    author: Author,
    /// relative paths staged since the last commit
    pending: Mutex<Vec<PathBuf>>,
    sequence: AsyncMutex<()>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .field("author", &self.author)
            .finish_non_exhaustive()
    }
}

impl Repository {
    pub fn new(root: impl Into<PathBuf>, versioning: Arc<dyn Versioning>, author: Author) -> Self {
        Self {
            root: root.into(),
            versioning,
            author,
            pending: Mutex::new(Vec::new()),
            sequence: AsyncMutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Paths staged since the last commit, relative to the root
    pub fn pending(&self) -> Vec<PathBuf> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `path` relative to the repository root
    pub fn relative_path(&self, path: &Path) -> VersioningResult<PathBuf> {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .map_err(|_| VersioningError::OutsideRepository(path.to_path_buf()))
    }

    /// Stage absolute `paths` for addition
    pub async fn add(&self, paths: &[PathBuf]) -> DbResult<()> {
        let _sequence = self.sequence.lock().await;
        self.stage(StageKind::Add, paths).await
    }

    /// Stage absolute `paths` for removal
    pub async fn remove(&self, paths: &[PathBuf]) -> DbResult<()> {
        let _sequence = self.sequence.lock().await;
        self.stage(StageKind::Remove, paths).await
    }

    /// Drop absolute `paths` from the staging area
    pub async fn reset(&self, paths: &[PathBuf]) -> DbResult<()> {
        let _sequence = self.sequence.lock().await;
        let relative = self.relative_paths(paths)?;
        for path in &relative {
            self.versioning.unstage(&self.root, path).await?;
        }
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|staged| !relative.contains(staged));
        Ok(())
    }

    /// Commit what is staged. Without a message, one naming the staged
    /// paths is used.
    pub async fn commit(&self, message: Option<&str>) -> DbResult<String> {
        let _sequence = self.sequence.lock().await;
        self.commit_staged(message).await
    }

    /// Stage `paths` and commit them as one uninterrupted sequence
    pub(crate) async fn checkpoint(&self, kind: StageKind, paths: &[PathBuf]) -> DbResult<String> {
        let _sequence = self.sequence.lock().await;
        self.stage(kind, paths).await?;
        self.commit_staged(None).await
    }

    fn relative_paths(&self, paths: &[PathBuf]) -> VersioningResult<Vec<PathBuf>> {
        paths.iter().map(|path| self.relative_path(path)).collect()
    }

    async fn stage(&self, kind: StageKind, paths: &[PathBuf]) -> DbResult<()> {
        let relative = self.relative_paths(paths)?;
        // one at a time: git holds an index lock per invocation
        for path in &relative {
            match kind {
                StageKind::Add => self.versioning.stage_add(&self.root, path).await?,
                StageKind::Remove => self.versioning.stage_remove(&self.root, path).await?,
            }
            debug!(path = %path.display(), kind = ?kind, "Staged");
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if !pending.contains(path) {
                pending.push(path.clone());
            }
        }
        Ok(())
    }

    async fn commit_staged(&self, message: Option<&str>) -> DbResult<String> {
        let pending = self.pending();
        let message = match message {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => default_message(&pending),
        };

        let commit_id = self
            .versioning
            .commit(&self.root, &message, &self.author)
            .await?;

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|path| !pending.contains(path));
        info!(commit = %commit_id, files = pending.len(), "Committed");
        Ok(commit_id)
    }
}

fn default_message(paths: &[PathBuf]) -> String {
    let names: Vec<String> = paths
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    format!("Commit files: {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::versioning::{InMemoryVersioning, VersioningCall};

    fn repository() -> (Repository, Arc<InMemoryVersioning>) {
        let versioning = Arc::new(InMemoryVersioning::new());
        let repo = Repository::new("/repo", versioning.clone(), Author::default());
        (repo, versioning)
    }

    #[tokio::test]
    async fn test_add_stages_relative_paths() {
        let (repo, versioning) = repository();

        repo.add(&[PathBuf::from("/repo/db/users/a.json")]).await.unwrap();

        assert_eq!(
            versioning.calls(),
            vec![VersioningCall::StageAdd(PathBuf::from("db/users/a.json"))]
        );
        assert_eq!(repo.pending(), vec![PathBuf::from("db/users/a.json")]);
    }

    #[tokio::test]
    async fn test_path_outside_repository_is_rejected() {
        let (repo, versioning) = repository();

        let err = repo.add(&[PathBuf::from("/elsewhere/a.json")]).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::Versioning(VersioningError::OutsideRepository(_))
        ));
        assert!(versioning.calls().is_empty());
    }

    #[tokio::test]
    async fn test_default_commit_message_names_staged_paths() {
        let (repo, versioning) = repository();
        repo.add(&[PathBuf::from("/repo/u/a.json")]).await.unwrap();
        repo.remove(&[PathBuf::from("/repo/u/b.json")]).await.unwrap();

        repo.commit(None).await.unwrap();

        let commits = versioning.commits();
        assert_eq!(commits[0].message, "Commit files: u/a.json, u/b.json");
        assert!(repo.pending().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_commit_message_wins() {
        let (repo, versioning) = repository();
        repo.add(&[PathBuf::from("/repo/u/a.json")]).await.unwrap();

        repo.commit(Some("seed users")).await.unwrap();

        assert_eq!(versioning.commits()[0].message, "seed users");
    }

    #[tokio::test]
    async fn test_reset_unstages() {
        let (repo, versioning) = repository();
        repo.add(&[PathBuf::from("/repo/u/a.json")]).await.unwrap();

        repo.reset(&[PathBuf::from("/repo/u/a.json")]).await.unwrap();

        assert!(repo.pending().is_empty());
        assert!(versioning.staged_additions().is_empty());
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_pending() {
        let (repo, versioning) = repository();
        versioning.reject_commits(true);

        let err = repo
            .checkpoint(StageKind::Add, &[PathBuf::from("/repo/u/a.json")])
            .await
            .unwrap_err();

        assert_eq!(err.code(), "GITDB_COMMIT_REJECTED");
        assert_eq!(repo.pending(), vec![PathBuf::from("u/a.json")]);
    }
}
