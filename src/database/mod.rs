//! # Database
//!
//! Owns the set of collections living under one root directory. Each
//! subdirectory of the root is a collection; each `.json` file inside it is
//! a record. The handle also exposes staging and commit against the
//! repository holding the root.
//!
//! ```text
//! <root>/
//!   users/
//!     7f0c...e1.json
//!   orders/
//! ```

mod repository;

pub use repository::{Repository, StageKind};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::collection::Collection;
use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::record::Record;
use crate::strategy::{CollectionStrategy, FileStrategy, MemoryStrategy};
use crate::versioning::{find_repository_root, GitCli, Versioning};

/// Handle on an open database
#[derive(Debug)]
pub struct Database {
    config: DbConfig,
    /// canonical form of `config.root_directory`
    root: PathBuf,
    repository: Arc<Repository>,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Database {
    /// Open the database at `config.root_directory`, versioned with the
    /// `git` binary
    pub async fn open(config: DbConfig) -> DbResult<Self> {
        let mut git = GitCli::new();
        if let Some(timeout) = config.versioning_timeout() {
            git = git.with_timeout(timeout);
        }
        Self::open_with(config, Arc::new(git)).await
    }

    /// Open the database with an explicit versioning collaborator
    pub async fn open_with(config: DbConfig, versioning: Arc<dyn Versioning>) -> DbResult<Self> {
        config.validate()?;

        let configured = &config.root_directory;
        tokio::fs::create_dir_all(configured)
            .await
            .map_err(|e| DbError::io(configured, e))?;
        let root = tokio::fs::canonicalize(configured)
            .await
            .map_err(|e| DbError::io(configured, e))?;

        let repository_root = match &config.repository_root {
            Some(path) => tokio::fs::canonicalize(path)
                .await
                .map_err(|e| DbError::io(path, e))?,
            None => find_repository_root(&root)
                .await
                .unwrap_or_else(|| root.clone()),
        };
        if !root.starts_with(&repository_root) {
            return Err(DbError::config(format!(
                "repository_root {} does not contain root_directory {}",
                repository_root.display(),
                root.display()
            )));
        }
        info!(
            root = %root.display(),
            repository = %repository_root.display(),
            cache = config.cache_enabled,
            auto_commit = config.auto_commit,
            "Opening database"
        );

        let repository = Arc::new(Repository::new(
            repository_root,
            versioning,
            config.author.clone(),
        ));
        let db = Self {
            config,
            root,
            repository,
            collections: RwLock::new(HashMap::new()),
        };
        db.init().await?;
        Ok(db)
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Canonical root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    /// Register every collection directory under the root not registered
    /// yet. Returns how many were loaded.
    pub async fn init(&self) -> DbResult<usize> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| DbError::io(&self.root, e))?;

        let mut loaded = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DbError::io(&self.root, e))?
        {
            let path = entry.path();
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %path.display(), "Skipping entry with non UTF-8 name");
                continue;
            };
            if name.starts_with('.') {
                debug!(entry = %name, "Skipping hidden entry");
                continue;
            }
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| DbError::io(&path, e))?;
            if !file_type.is_dir() {
                warn!(entry = %name, "Skipping non-directory entry");
                continue;
            }
            if self.get(&name).is_some() {
                continue;
            }

            let collection = self.load_collection(&name, path).await?;
            if self.register(collection).is_some() {
                loaded += 1;
            }
        }

        info!(count = loaded, "Loaded collections");
        Ok(loaded)
    }

    async fn load_collection(&self, name: &str, path: PathBuf) -> DbResult<Collection> {
        let files = FileStrategy::new(path);
        let memory = if self.config.cache_enabled {
            let records = files.get_all().await?;
            debug!(collection = %name, count = records.len(), "Warmed cache");
            Some(MemoryStrategy::new(records))
        } else {
            None
        };
        Ok(self.collection(name, files, memory))
    }

    fn collection(&self, name: &str, files: FileStrategy, memory: Option<MemoryStrategy>) -> Collection {
        Collection::new(
            name,
            files,
            memory,
            Arc::clone(&self.repository),
            self.config.auto_commit,
        )
    }

    /// Add `collection` unless its name is taken. Returns the registered
    /// handle, or `None` when another one won.
    fn register(&self, collection: Collection) -> Option<Arc<Collection>> {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if collections.contains_key(collection.name()) {
            return None;
        }
        let collection = Arc::new(collection);
        collections.insert(collection.name().to_string(), Arc::clone(&collection));
        info!(collection = %collection.name(), cached = collection.is_cached(), "Registered collection");
        Some(collection)
    }

    /// The collection called `name`, if registered
    pub fn get(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered collection names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Create the directory of a new, empty collection and register it
    pub async fn create_collection(&self, name: &str) -> DbResult<Arc<Collection>> {
        validate_name(name)?;
        if self.get(name).is_some() {
            return Err(DbError::AlreadyExists(name.to_string()));
        }

        let path = self.root.join(name);
        match tokio::fs::create_dir(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(DbError::AlreadyExists(name.to_string()));
            }
            Err(e) => return Err(DbError::io(&path, e)),
        }

        let memory = self.config.cache_enabled.then(MemoryStrategy::default);
        let collection = self.collection(name, FileStrategy::new(path), memory);
        self.register(collection)
            .ok_or_else(|| DbError::AlreadyExists(name.to_string()))
    }

    /// Delete every record of `name`, remove its directory and forget it.
    /// Returns the deleted records.
    pub async fn delete(&self, name: &str) -> DbResult<Vec<Record>> {
        let collection = self
            .get(name)
            .ok_or_else(|| DbError::NotFound(name.to_string()))?;

        let removed = collection
            .drop_all(|| {
                let mut collections = self
                    .collections
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                if collections
                    .get(name)
                    .is_some_and(|registered| Arc::ptr_eq(registered, &collection))
                {
                    collections.remove(name);
                }
            })
            .await
            .map_err(|e| match e {
                // lost a race with another delete of the same collection
                DbError::Closed(_) => DbError::NotFound(name.to_string()),
                other => other,
            })?;
        info!(collection = %name, count = removed.len(), "Deleted collection");
        Ok(removed)
    }

    /// Stage absolute `paths` for addition
    pub async fn add(&self, paths: &[PathBuf]) -> DbResult<()> {
        self.repository.add(paths).await
    }

    /// Stage absolute `paths` for removal
    pub async fn remove(&self, paths: &[PathBuf]) -> DbResult<()> {
        self.repository.remove(paths).await
    }

    /// Unstage absolute `paths`
    pub async fn reset(&self, paths: &[PathBuf]) -> DbResult<()> {
        self.repository.reset(paths).await
    }

    /// Commit what is staged. Returns the commit identifier.
    pub async fn commit(&self, message: Option<&str>) -> DbResult<String> {
        self.repository.commit(message).await
    }
}

/// Collection names are one visible path component
fn validate_name(name: &str) -> DbResult<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).components().count() != 1;
    if invalid {
        return Err(DbError::InvalidName(name.to_string()));
    }
    Ok(())
}
