//! CLI command implementations
//!
//! Each command opens the database described by the configuration file,
//! performs one operation and returns the response payload. `run` prints
//! the payload, or the error, as a single JSON object.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::collection::Collection;
use crate::config::DbConfig;
use crate::database::Database;
use crate::record::{Record, ID_FIELD};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub async fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    match run_command(cli.command).await {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run the appropriate command based on CLI args
pub async fn run_command(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Collections { config } => collections(&config).await,
        Command::Create { config, name } => create(&config, &name).await,
        Command::Drop { config, name } => drop(&config, &name).await,
        Command::Insert {
            config,
            collection,
            data,
        } => {
            let data = match data {
                Some(text) => serde_json::from_str(&text)?,
                None => read_request()?,
            };
            insert(&config, &collection, data).await
        }
        Command::All { config, collection } => all(&config, &collection).await,
        Command::Find {
            config,
            collection,
            field,
            equals,
        } => find(&config, &collection, &field, &parse_value(&equals)).await,
        Command::Commit { config, message } => commit(&config, message.as_deref()).await,
    }
}

async fn open(config_path: &Path) -> CliResult<Database> {
    let config = DbConfig::load(config_path)?;
    debug!(config = %config_path.display(), "Loaded configuration");
    Ok(Database::open(config).await?)
}

fn collection(db: &Database, name: &str) -> CliResult<Arc<Collection>> {
    db.get(name).ok_or_else(|| CliError::unknown_collection(name))
}

fn records_json(records: &[Record]) -> Value {
    Value::Array(records.iter().map(Record::to_value).collect())
}

/// List the registered collections
pub async fn collections(config_path: &Path) -> CliResult<Value> {
    let db = open(config_path).await?;
    Ok(json!({ "collections": db.list() }))
}

/// Create an empty collection
pub async fn create(config_path: &Path, name: &str) -> CliResult<Value> {
    let db = open(config_path).await?;
    let created = db.create_collection(name).await?;
    Ok(json!({
        "created": created.name(),
        "path": created.path().display().to_string(),
    }))
}

/// Delete a collection with all of its records
pub async fn drop(config_path: &Path, name: &str) -> CliResult<Value> {
    let db = open(config_path).await?;
    let removed = db.delete(name).await?;
    Ok(json!({
        "dropped": name,
        "deleted": records_json(&removed),
    }))
}

/// Insert one record built from a JSON object
pub async fn insert(config_path: &Path, name: &str, data: Value) -> CliResult<Value> {
    if !data.is_object() {
        return Err(CliError::invalid_input("Record data must be a JSON object"));
    }
    let db = open(config_path).await?;
    let record = collection(&db, name)?.insert(data).await?;
    Ok(record.to_value())
}

/// Every record of a collection
pub async fn all(config_path: &Path, name: &str) -> CliResult<Value> {
    let db = open(config_path).await?;
    let records = collection(&db, name)?.get_all().await?;
    Ok(records_json(&records))
}

/// The records of a collection whose `field` equals `expected`
pub async fn find(config_path: &Path, name: &str, field: &str, expected: &Value) -> CliResult<Value> {
    let db = open(config_path).await?;
    let filter = |record: &Record| field_equals(record, field, expected);
    let records = collection(&db, name)?.get_data(&filter).await?;
    Ok(records_json(&records))
}

/// Commit staged changes
pub async fn commit(config_path: &Path, message: Option<&str>) -> CliResult<Value> {
    let db = open(config_path).await?;
    let commit_id = db.commit(message).await?;
    Ok(json!({ "commit": commit_id }))
}

fn field_equals(record: &Record, field: &str, expected: &Value) -> bool {
    if field == ID_FIELD {
        return expected.as_str() == Some(record.id());
    }
    record.get(field) == Some(expected)
}

/// Parse a command line value as JSON, falling back to a plain string
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_config(temp_dir: &TempDir) -> std::path::PathBuf {
        let config_path = temp_dir.path().join("gitdb.json");
        let root = temp_dir.path().join("data");

        let config = json!({
            "root_directory": root.to_string_lossy(),
            "cache_enabled": true
        });

        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("3"), json!(3));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("\"quoted\""), json!("quoted"));
        assert_eq!(parse_value("bare"), json!("bare"));
    }

    #[test]
    fn test_field_equals() {
        let record = Record::from_value("u1", json!({"age": 3, "name": "ana"})).unwrap();
        assert!(field_equals(&record, "age", &json!(3)));
        assert!(!field_equals(&record, "age", &json!("3")));
        assert!(field_equals(&record, "id", &json!("u1")));
        assert!(!field_equals(&record, "missing", &json!(null)));
    }

    #[tokio::test]
    async fn test_create_insert_find() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        create(&config_path, "users").await.unwrap();
        insert(&config_path, "users", json!({"name": "ana", "age": 3}))
            .await
            .unwrap();
        insert(&config_path, "users", json!({"name": "bo", "age": 4}))
            .await
            .unwrap();

        let listed = collections(&config_path).await.unwrap();
        assert_eq!(listed, json!({"collections": ["users"]}));

        let found = find(&config_path, "users", "age", &json!(4)).await.unwrap();
        let found = found.as_array().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], json!("bo"));

        let everything = all(&config_path, "users").await.unwrap();
        assert_eq!(everything.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_drop_returns_deleted_records() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        create(&config_path, "users").await.unwrap();
        insert(&config_path, "users", json!({"name": "ana"})).await.unwrap();

        let dropped = drop(&config_path, "users").await.unwrap();

        assert_eq!(dropped["dropped"], json!("users"));
        assert_eq!(dropped["deleted"].as_array().unwrap().len(), 1);
        assert_eq!(collections(&config_path).await.unwrap(), json!({"collections": []}));
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let err = all(&config_path, "ghosts").await.unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::UnknownCollection);
    }

    #[tokio::test]
    async fn test_insert_rejects_non_object() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let err = insert(&config_path, "users", json!([1, 2])).await.unwrap_err();
        assert_eq!(err.code_str(), "GITDB_CLI_INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_missing_config() {
        let temp_dir = TempDir::new().unwrap();

        let err = collections(&temp_dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "GITDB_CONFIG_ERROR");
    }
}
