//! CLI module for gitdb
//!
//! Provides command-line access to a database:
//! - collections: List registered collections
//! - create / drop: Collection lifecycle
//! - insert / all / find: Record access
//! - commit: Commit staged changes

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{all, collections, commit, create, drop, find, insert, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
