//! CLI module for docarchive
//!
//! Provides command-line interface for:
//! - dump: Write a database to chunked archives
//! - restore: Load chunked archives into a database

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, DEFAULT_LOCATION};
pub use commands::{dump, load_config, restore, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_summary, write_summary_to};
