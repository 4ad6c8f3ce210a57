//! # Memory Strategy
//!
//! In-process mirror of a collection. The record sequence sits behind an
//! `Arc` that is replaced wholesale on every mutation: readers clone the
//! `Arc` and keep a stable snapshot, writers build the next sequence and
//! swap it in with one assignment.

use std::sync::{Arc, PoisonError, RwLock};

use super::{CollectionStrategy, StrategyFuture};
use crate::record::{Filter, Modifier, Record};

/// Cache mirror of one collection
#[derive(Debug, Default)]
pub struct MemoryStrategy {
    records: RwLock<Arc<Vec<Record>>>,
}

impl MemoryStrategy {
    /// Create a mirror seeded with `records`
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: RwLock::new(Arc::new(records)),
        }
    }

    /// Current sequence. Never partial: a swap replaces the whole `Arc`.
    pub fn snapshot(&self) -> Arc<Vec<Record>> {
        // the guarded value is a single Arc, so a poisoned lock still holds
        // a complete sequence
        let guard = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Copy of every record
    pub fn records(&self) -> Vec<Record> {
        self.snapshot().as_ref().clone()
    }

    /// Copies of the records matching `filter`
    pub fn matching(&self, filter: Filter<'_>) -> Vec<Record> {
        self.snapshot()
            .iter()
            .filter(|record| filter(*record))
            .cloned()
            .collect()
    }

    /// Build the next sequence from the current one and swap it in
    fn swap<T>(&self, next: impl FnOnce(&[Record]) -> (Vec<Record>, T)) -> T {
        let mut guard = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let (records, output) = next(guard.as_slice());
        *guard = Arc::new(records);
        output
    }

    /// Add `record`, replacing any record with the same identifier
    pub fn put(&self, record: Record) -> Record {
        self.swap(|current| {
            let mut next: Vec<Record> = current
                .iter()
                .filter(|existing| existing.id() != record.id())
                .cloned()
                .collect();
            next.push(record.clone());
            (next, record)
        })
    }

    /// Apply `modifier` to every matching record, keeping its identifier.
    /// Non-matching records are kept as they are.
    pub fn replace_matching(&self, filter: Filter<'_>, modifier: Modifier<'_>) -> Vec<Record> {
        self.swap(|current| {
            let mut updated = Vec::new();
            let next = current
                .iter()
                .map(|record| {
                    if filter(record) {
                        let replacement = modifier(record).with_id(record.id());
                        updated.push(replacement.clone());
                        replacement
                    } else {
                        record.clone()
                    }
                })
                .collect();
            (next, updated)
        })
    }

    /// Drop every matching record, returning the dropped ones
    pub fn remove_matching(&self, filter: Filter<'_>) -> Vec<Record> {
        self.swap(|current| {
            let (removed, kept): (Vec<Record>, Vec<Record>) =
                current.iter().cloned().partition(|record| filter(record));
            (kept, removed)
        })
    }

    /// Replace the whole sequence with `records`
    pub fn reload(&self, records: Vec<Record>) {
        self.swap(|_| (records, ()));
    }

    /// Mirror an insert the durable store already performed
    pub fn mirror_insert(&self, record: Record) {
        self.put(record);
    }

    /// Mirror records the durable store rewrote. Records are matched by
    /// identifier; one the mirror does not hold is appended.
    pub fn mirror_update(&self, updated: &[Record]) {
        if updated.is_empty() {
            return;
        }
        self.swap(|current| {
            let mut next: Vec<Record> = current
                .iter()
                .map(|record| {
                    updated
                        .iter()
                        .find(|replacement| replacement.id() == record.id())
                        .unwrap_or(record)
                        .clone()
                })
                .collect();
            for replacement in updated {
                if !current.iter().any(|record| record.id() == replacement.id()) {
                    next.push(replacement.clone());
                }
            }
            (next, ())
        })
    }

    /// Mirror records the durable store removed
    pub fn mirror_delete(&self, removed: &[Record]) {
        if removed.is_empty() {
            return;
        }
        self.swap(|current| {
            let next = current
                .iter()
                .filter(|record| !removed.iter().any(|gone| gone.id() == record.id()))
                .cloned()
                .collect();
            (next, ())
        })
    }
}

impl CollectionStrategy for MemoryStrategy {
    fn get_all(&self) -> StrategyFuture<'_, Vec<Record>> {
        let records = self.records();
        Box::pin(async move { Ok(records) })
    }

    fn get_data<'a>(&'a self, filter: Filter<'a>) -> StrategyFuture<'a, Vec<Record>> {
        let records = self.matching(filter);
        Box::pin(async move { Ok(records) })
    }

    fn insert(&self, record: Record) -> StrategyFuture<'_, Record> {
        let record = self.put(record);
        Box::pin(async move { Ok(record) })
    }

    fn update<'a>(
        &'a self,
        filter: Filter<'a>,
        modifier: Modifier<'a>,
    ) -> StrategyFuture<'a, Vec<Record>> {
        let updated = self.replace_matching(filter, modifier);
        Box::pin(async move { Ok(updated) })
    }

    fn delete<'a>(&'a self, filter: Filter<'a>) -> StrategyFuture<'a, Vec<Record>> {
        let removed = self.remove_matching(filter);
        Box::pin(async move { Ok(removed) })
    }
}
