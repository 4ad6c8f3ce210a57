//! # Collection
//!
//! The entry point callers use for records. Reads go to the cache mirror
//! when one exists, otherwise to the durable store. Writes go to the
//! durable store first; the mirror then takes the store's result as is.
//!
//! Mutations on one collection are serialized and hold the collection's
//! write lock until their commit (if any) returns:
//!
//! ```text
//! Idle → Mutating → Staging → Committing → Idle
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::{Repository, StageKind};
use crate::error::{DbError, DbResult};
use crate::record::{match_all, Filter, Modifier, Record};
use crate::strategy::{CollectionStrategy, FileStrategy, MemoryStrategy};

/// A named set of records backed by one directory
#[derive(Debug)]
pub struct Collection {
    name: String,
    files: FileStrategy,
    memory: Option<MemoryStrategy>,
    repository: Arc<Repository>,
    auto_commit: bool,
    write_lock: Mutex<()>,
    /// set once the directory is gone; every later call fails
    closed: AtomicBool,
    /// the mirror missed a store change; reads use the store until the next
    /// mutation reloads it
    stale: AtomicBool,
}

/// Store-then-mirror step of one mutation. Dropped without `complete`, it
/// marks the mirror stale.
struct MirrorScope<'a> {
    collection: &'a Collection,
    completed: bool,
}

impl<'a> MirrorScope<'a> {
    fn begin(collection: &'a Collection) -> Self {
        Self {
            collection,
            completed: false,
        }
    }

    fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for MirrorScope<'_> {
    fn drop(&mut self) {
        if !self.completed && self.collection.memory.is_some() {
            warn!(collection = %self.collection.name, "Mutation abandoned, cache marked stale");
            self.collection.stale.store(true, Ordering::Release);
        }
    }
}

impl Collection {
    pub(crate) fn new(
        name: impl Into<String>,
        files: FileStrategy,
        memory: Option<MemoryStrategy>,
        repository: Arc<Repository>,
        auto_commit: bool,
    ) -> Self {
        Self {
            name: name.into(),
            files,
            memory,
            repository,
            auto_commit,
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            stale: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the collection's record files
    pub fn path(&self) -> &Path {
        self.files.collection_path()
    }

    /// Whether reads are served from a cache mirror
    pub fn is_cached(&self) -> bool {
        self.memory.is_some()
    }

    /// Whether the collection was deleted
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// File holding the record with `id`
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.files.record_path(id)
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.is_closed() {
            return Err(DbError::Closed(self.name.clone()));
        }
        Ok(())
    }

    fn reader(&self) -> &dyn CollectionStrategy {
        match &self.memory {
            Some(memory) if !self.stale.load(Ordering::Acquire) => memory,
            _ => &self.files,
        }
    }

    /// Take the write lock of an open collection, reloading a stale mirror
    async fn lock(&self) -> DbResult<MutexGuard<'_, ()>> {
        let guard = self.write_lock.lock().await;
        self.ensure_open()?;
        if self.stale.load(Ordering::Acquire) {
            if let Some(memory) = &self.memory {
                let records = self.files.get_all().await?;
                info!(collection = %self.name, count = records.len(), "Reloaded stale cache");
                memory.reload(records);
            }
            self.stale.store(false, Ordering::Release);
        }
        Ok(guard)
    }

    /// Every record
    pub async fn get_all(&self) -> DbResult<Vec<Record>> {
        self.ensure_open()?;
        Ok(self.reader().get_all().await?)
    }

    /// The records matching `filter`
    pub async fn get_data(&self, filter: Filter<'_>) -> DbResult<Vec<Record>> {
        self.ensure_open()?;
        Ok(self.reader().get_data(filter).await?)
    }

    /// Store a new record built from the JSON object `data`, under a freshly
    /// generated identifier. An `id` member in `data` is ignored.
    pub async fn insert(&self, data: Value) -> DbResult<Record> {
        let record = Record::from_value(Uuid::new_v4().to_string(), data)?;

        let _write = self.lock().await?;
        let scope = MirrorScope::begin(self);
        let record = self.files.insert(record).await?;
        if let Some(memory) = &self.memory {
            memory.mirror_insert(record.clone());
        }
        scope.complete();
        debug!(collection = %self.name, id = %record.id(), "Inserted record");

        let path = self.files.record_path(record.id());
        self.checkpoint(StageKind::Add, vec![path]).await?;
        Ok(record)
    }

    /// Replace every matching record with `modifier`'s output. The original
    /// identifier is always kept. Returns the replacements.
    ///
    /// Dropping the future before it completes may leave some files
    /// rewritten. Unless the cache saw the whole result, it is marked stale:
    /// reads go to the store and the next mutation reloads the cache.
    pub async fn update(&self, filter: Filter<'_>, modifier: Modifier<'_>) -> DbResult<Vec<Record>> {
        let _write = self.lock().await?;
        let scope = MirrorScope::begin(self);
        let updated = self.files.update(filter, modifier).await?;
        if let Some(memory) = &self.memory {
            memory.mirror_update(&updated);
        }
        scope.complete();
        debug!(collection = %self.name, count = updated.len(), "Updated records");

        let paths = self.touched_paths(&updated);
        self.checkpoint(StageKind::Add, paths).await?;
        Ok(updated)
    }

    /// Remove every matching record. Returns the removed records.
    ///
    /// Cancellation behaves as for [`update`](Self::update).
    pub async fn delete(&self, filter: Filter<'_>) -> DbResult<Vec<Record>> {
        let _write = self.lock().await?;
        self.delete_locked(filter).await
    }

    async fn delete_locked(&self, filter: Filter<'_>) -> DbResult<Vec<Record>> {
        let scope = MirrorScope::begin(self);
        let removed = self.files.delete(filter).await?;
        if let Some(memory) = &self.memory {
            memory.mirror_delete(&removed);
        }
        scope.complete();
        debug!(collection = %self.name, count = removed.len(), "Deleted records");

        let paths = self.touched_paths(&removed);
        self.checkpoint(StageKind::Remove, paths).await?;
        Ok(removed)
    }

    /// Delete every record, remove the directory and close the collection,
    /// all under the write lock. `unregister` runs before the lock is
    /// released. Returns the deleted records.
    pub(crate) async fn drop_all(&self, unregister: impl FnOnce()) -> DbResult<Vec<Record>> {
        let _write = self.lock().await?;
        let removed = self.delete_locked(&match_all).await?;

        let dir = self.path();
        tokio::fs::remove_dir_all(dir)
            .await
            .map_err(|e| DbError::io(dir, e))?;
        self.closed.store(true, Ordering::Release);
        if let Some(memory) = &self.memory {
            memory.reload(Vec::new());
        }
        unregister();
        Ok(removed)
    }

    fn touched_paths(&self, records: &[Record]) -> Vec<PathBuf> {
        records
            .iter()
            .map(|record| self.files.record_path(record.id()))
            .collect()
    }

    /// Stage and commit `paths` when auto-commit is on. A failure here comes
    /// after the store already changed: the repository lags the store.
    async fn checkpoint(&self, kind: StageKind, paths: Vec<PathBuf>) -> DbResult<()> {
        if !self.auto_commit || paths.is_empty() {
            return Ok(());
        }
        let commit_id = self.repository.checkpoint(kind, &paths).await?;
        info!(
            collection = %self.name,
            commit = %commit_id,
            files = paths.len(),
            "Checkpointed mutation"
        );
        Ok(())
    }
}
