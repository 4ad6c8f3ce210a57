//! CLI argument definitions using clap
//!
//! Commands:
//! - gitdb collections --config <path>
//! - gitdb create --config <path> <name>
//! - gitdb drop --config <path> <name>
//! - gitdb insert --config <path> <collection> [--data <json>]
//! - gitdb all --config <path> <collection>
//! - gitdb find --config <path> <collection> --field <name> --equals <json>
//! - gitdb commit --config <path> [--message <text>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "./gitdb.json";

/// gitdb - A document store kept as files in a git repository
#[derive(Parser, Debug)]
#[command(name = "gitdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the registered collections
    Collections {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Create an empty collection
    Create {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Collection name
        name: String,
    },

    /// Delete a collection and all of its records
    Drop {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Collection name
        name: String,
    },

    /// Insert one record. Reads the JSON object from stdin without --data.
    Insert {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Collection name
        collection: String,

        /// Record content as a JSON object
        #[arg(long)]
        data: Option<String>,
    },

    /// Print every record of a collection
    All {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Collection name
        collection: String,
    },

    /// Print the records whose field equals a value
    Find {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Collection name
        collection: String,

        /// Field to compare (`id` compares identifiers)
        #[arg(long)]
        field: String,

        /// Expected value as JSON; bare text is taken as a string
        #[arg(long)]
        equals: String,
    },

    /// Commit staged changes
    Commit {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Commit message. Defaults to one listing the staged files.
        #[arg(long, short)]
        message: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let cli = Cli::try_parse_from(["gitdb", "collections"]).unwrap();
        match cli.command {
            Command::Collections { config } => assert_eq!(config, PathBuf::from(DEFAULT_CONFIG)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_find_requires_field_and_value() {
        assert!(Cli::try_parse_from(["gitdb", "find", "users"]).is_err());

        let cli = Cli::try_parse_from([
            "gitdb", "find", "--config", "db.json", "users", "--field", "age", "--equals", "3",
        ])
        .unwrap();
        match cli.command {
            Command::Find {
                config,
                collection,
                field,
                equals,
            } => {
                assert_eq!(config, PathBuf::from("db.json"));
                assert_eq!(collection, "users");
                assert_eq!(field, "age");
                assert_eq!(equals, "3");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_commit_message_is_optional() {
        let cli = Cli::try_parse_from(["gitdb", "commit", "-m", "seed"]).unwrap();
        assert!(matches!(cli.command, Command::Commit { message: Some(ref m), .. } if m == "seed"));

        let cli = Cli::try_parse_from(["gitdb", "commit"]).unwrap();
        assert!(matches!(cli.command, Command::Commit { message: None, .. }));
    }
}
