//! CLI argument definitions using clap
//!
//! Commands:
//! - docarchive dump --db <dir> [--target <t>] ...
//! - docarchive restore --db <dir> [--source <s>] ...

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Default bucket and root for both directions
pub const DEFAULT_LOCATION: &str = "https://mongotool.s3.amazonaws.com/dump";

/// docarchive - chunked dump and restore of document databases
#[derive(Parser, Debug)]
#[command(name = "docarchive")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dump a database to a bucket, a directory or standard output
    ///
    /// A bucket is recognized when the target is a URL such as
    /// https://mongotool.s3.amazonaws.com/test, using "test" as its root.
    /// "-" selects standard output. Anything else is a directory.
    /// Remote targets need AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY.
    Dump {
        /// Database directory to read from
        #[arg(long)]
        db: PathBuf,

        /// Only dump this collection
        #[arg(long)]
        collection: Option<String>,

        /// Where to store the dump
        #[arg(long, default_value = DEFAULT_LOCATION)]
        target: String,

        /// Megabytes of documents per stored chunk
        #[arg(long, default_value_t = 1000)]
        size: u64,

        /// Number of chunks written at the same time
        #[arg(long, default_value_t = 1)]
        concurrency: usize,

        /// Compress chunks before they reach the target
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        compression: bool,

        /// Display an object count
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        progress: bool,

        /// JSON dump configuration, used instead of the flags above
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Restore a database from a bucket, a directory or standard input
    Restore {
        /// Database directory to write to, created if missing
        #[arg(long)]
        db: PathBuf,

        /// Where the dump is stored
        #[arg(long, default_value = DEFAULT_LOCATION)]
        source: String,

        /// Set to false if the dump was not compressed
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        compression: bool,

        /// Display an object count
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        progress: bool,

        /// Set to false to skip creating indexes
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        indexes: bool,

        /// Accept a bucket listing cut to its first page
        #[arg(long)]
        allow_truncated_listing: bool,

        /// JSON restore configuration, used instead of the flags above
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
