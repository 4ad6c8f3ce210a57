//! # Collection Strategies
//!
//! Two interchangeable ways of holding a collection's records:
//!
//! - [`FileStrategy`]: the durable store, one JSON file per record. This is
//!   the system of record.
//! - [`MemoryStrategy`]: the cache mirror, an in-process copy of the same
//!   record set that never touches disk.
//!
//! Both expose the same surface through [`CollectionStrategy`].

mod errors;
mod file;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use file::{FileStrategy, RECORD_EXTENSION};
pub use memory::MemoryStrategy;

use std::future::Future;
use std::pin::Pin;

use crate::record::{Filter, Modifier, Record};

/// Boxed future returned by strategy operations
pub type StrategyFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Operation surface shared by the durable store and the cache mirror
pub trait CollectionStrategy: Send + Sync {
    /// Every record, as a copy the caller owns
    fn get_all(&self) -> StrategyFuture<'_, Vec<Record>>;

    /// The records matching `filter`
    fn get_data<'a>(&'a self, filter: Filter<'a>) -> StrategyFuture<'a, Vec<Record>>;

    /// Store a record, replacing one with the same identifier
    fn insert(&self, record: Record) -> StrategyFuture<'_, Record>;

    /// Replace every matching record with `modifier`'s output, keeping the
    /// original identifier. Returns the replacements.
    fn update<'a>(
        &'a self,
        filter: Filter<'a>,
        modifier: Modifier<'a>,
    ) -> StrategyFuture<'a, Vec<Record>>;

    /// Remove every matching record. Returns the removed records as they were.
    fn delete<'a>(&'a self, filter: Filter<'a>) -> StrategyFuture<'a, Vec<Record>>;
}
