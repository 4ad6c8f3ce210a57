//! gitdb - An embedded document store kept as files in a git repository
//!
//! Every collection is a directory; every record is one pretty-printed JSON
//! file named after its identifier. Mutations can be staged and committed
//! automatically, so the repository history doubles as the change log.
//!
//! ```no_run
//! use gitdb::{Database, DbConfig, Record};
//! use serde_json::json;
//!
//! # async fn demo() -> gitdb::DbResult<()> {
//! let db = Database::open(DbConfig::new("./data").with_cache(true)).await?;
//! let users = db.create_collection("users").await?;
//! users.insert(json!({"name": "ana"})).await?;
//! let anas = users
//!     .get_data(&|r: &Record| r.get("name") == Some(&json!("ana")))
//!     .await?;
//! assert_eq!(anas.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod collection;
pub mod config;
pub mod database;
pub mod error;
pub mod record;
pub mod strategy;
pub mod versioning;

pub use collection::Collection;
pub use config::DbConfig;
pub use database::{Database, Repository, StageKind};
pub use error::{DbError, DbResult};
pub use record::{match_all, Fields, Filter, Modifier, Record, ID_FIELD};
pub use strategy::{
    CollectionStrategy, FileStrategy, MemoryStrategy, StoreError, StoreResult, RECORD_EXTENSION,
};
pub use versioning::{
    find_repository_root, Author, GitCli, InMemoryVersioning, Versioning, VersioningError,
    VersioningResult,
};
