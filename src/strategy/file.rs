//! # File Strategy
//!
//! Durable store for one collection: `<collection>/<id>.json`, one record
//! per file. Record writes go to a sibling temp file first and are renamed
//! into place, so a reader never sees half a record.

use std::io;
use std::path::{Path, PathBuf};

use futures_util::future::try_join_all;
use tokio::fs;
use tracing::debug;

use super::errors::{StoreError, StoreResult};
use super::{CollectionStrategy, StrategyFuture};
use crate::record::{Filter, Modifier, Record};

/// Extension of record files
pub const RECORD_EXTENSION: &str = "json";

const TEMP_EXTENSION: &str = "json.tmp";

/// Durable file-per-record storage
#[derive(Debug, Clone)]
pub struct FileStrategy {
    collection_path: PathBuf,
}

impl FileStrategy {
    /// Create a store over an existing collection directory
    pub fn new(collection_path: impl Into<PathBuf>) -> Self {
        Self {
            collection_path: collection_path.into(),
        }
    }

    pub fn collection_path(&self) -> &Path {
        &self.collection_path
    }

    /// Path of the file holding the record with `id`
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.collection_path
            .join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    async fn record_files(&self) -> StoreResult<Vec<PathBuf>> {
        let dir = &self.collection_path;
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| StoreError::io(dir, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                debug!(path = %path.display(), "Skipping non-record entry");
                continue;
            }
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StoreError::io(&path, e))?;
            if file_type.is_file() {
                files.push(path);
            }
        }

        Ok(files)
    }

    async fn read_records(&self) -> StoreResult<Vec<Record>> {
        let files = self.record_files().await?;
        try_join_all(files.into_iter().map(read_record)).await
    }

    async fn write_record(&self, record: &Record) -> StoreResult<PathBuf> {
        validate_id(record.id())?;
        let path = self.record_path(record.id());

        let mut body = serde_json::to_vec_pretty(record)
            .map_err(|e| StoreError::write_failed(&path, e.to_string()))?;
        body.push(b'\n');

        let temp_path = path.with_extension(TEMP_EXTENSION);
        fs::write(&temp_path, &body)
            .await
            .map_err(|e| StoreError::write_failed(&path, e.to_string()))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StoreError::write_failed(&path, e.to_string()))?;

        debug!(path = %path.display(), "Wrote record");
        Ok(path)
    }

    async fn remove_record(&self, record: &Record) -> StoreResult<PathBuf> {
        let path = self.record_path(record.id());
        match fs::remove_file(&path).await {
            Ok(()) => {}
            // already gone counts as deleted
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&path, e)),
        }
        debug!(path = %path.display(), "Removed record");
        Ok(path)
    }
}

impl CollectionStrategy for FileStrategy {
    fn get_all(&self) -> StrategyFuture<'_, Vec<Record>> {
        Box::pin(self.read_records())
    }

    fn get_data<'a>(&'a self, filter: Filter<'a>) -> StrategyFuture<'a, Vec<Record>> {
        Box::pin(async move {
            let records = self.read_records().await?;
            Ok(records.into_iter().filter(|record| filter(record)).collect())
        })
    }

    fn insert(&self, record: Record) -> StrategyFuture<'_, Record> {
        Box::pin(async move {
            self.write_record(&record).await?;
            Ok(record)
        })
    }

    fn update<'a>(
        &'a self,
        filter: Filter<'a>,
        modifier: Modifier<'a>,
    ) -> StrategyFuture<'a, Vec<Record>> {
        Box::pin(async move {
            let records = self.read_records().await?;
            let updated: Vec<Record> = records
                .iter()
                .filter(|record| filter(*record))
                .map(|record| modifier(record).with_id(record.id()))
                .collect();

            // no rollback: a failed write leaves earlier siblings in place
            try_join_all(updated.iter().map(|record| self.write_record(record))).await?;
            Ok(updated)
        })
    }

    fn delete<'a>(&'a self, filter: Filter<'a>) -> StrategyFuture<'a, Vec<Record>> {
        Box::pin(async move {
            let records = self.read_records().await?;
            let removed: Vec<Record> = records
                .into_iter()
                .filter(|record| filter(record))
                .collect();

            try_join_all(removed.iter().map(|record| self.remove_record(record))).await?;
            Ok(removed)
        })
    }
}

async fn read_record(path: PathBuf) -> StoreResult<Record> {
    let bytes = fs::read(&path)
        .await
        .map_err(|e| StoreError::io(&path, e))?;
    let record: Record =
        serde_json::from_slice(&bytes).map_err(|e| StoreError::corrupt(&path, e.to_string()))?;

    // the file name is the identifier; anything else could not be deleted
    let stem = path.file_stem().and_then(|stem| stem.to_str());
    if stem != Some(record.id()) {
        return Err(StoreError::corrupt(
            &path,
            format!("identifier {:?} does not match file name", record.id()),
        ));
    }

    Ok(record)
}

fn validate_id(id: &str) -> StoreResult<()> {
    if id.is_empty() {
        return Err(StoreError::InvalidRecord("identifier is empty".into()));
    }
    if id.starts_with('.') || id.contains(['/', '\\']) || id.contains('\0') {
        return Err(StoreError::InvalidRecord(format!(
            "identifier {:?} is not a valid file name",
            id
        )));
    }
    Ok(())
}
