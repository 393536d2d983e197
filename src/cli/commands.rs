//! CLI command implementations
//!
//! Each command resolves its configuration, opens the local database,
//! selects a storage backend and hands over to the dump or restore
//! manager. The summary is printed to stdout as one JSON line.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::database::LocalDatabase;
use crate::dump::{DumpConfig, DumpManager, DumpSummary, MB};
use crate::file_storage::{select_backend, StorageOptions};
use crate::observability::{init_logging, Event, Progress};
use crate::restore::{RestoreConfig, RestoreManager, RestoreSummary};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_summary;

/// Load a JSON configuration file
pub fn load_config<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::config_error(format!("Failed to read config {}: {}", path.display(), e)))?;

    let config = serde_json::from_str(&content)
        .map_err(|e| CliError::config_error(format!("Invalid config JSON in {}: {}", path.display(), e)))?;

    info!(event = %Event::ConfigLoaded, path = %path.display());
    Ok(config)
}

/// Main CLI entry point
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_logging(cli.log_json);
    run_command(cli.command)
}

/// Run a parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Dump {
            db,
            collection,
            target,
            size,
            concurrency,
            compression,
            progress,
            config,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => DumpConfig {
                    target,
                    collection,
                    concurrency,
                    chunk_size: size.saturating_mul(MB),
                    compression,
                    progress,
                },
            };
            let summary = dump(&db, &config)?;
            write_summary("dump", &summary)
        }
        Command::Restore {
            db,
            source,
            compression,
            progress,
            indexes,
            allow_truncated_listing,
            config,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => RestoreConfig {
                    source,
                    compression,
                    progress,
                    indexes,
                    allow_truncated_listing,
                },
            };
            let summary = restore(&db, &config)?;
            write_summary("restore", &summary)
        }
    }
}

/// Dump the database in `db` according to `config`
pub fn dump(db: &Path, config: &DumpConfig) -> CliResult<DumpSummary> {
    let database = LocalDatabase::open(db)?;
    let target = select_backend(
        &config.target,
        StorageOptions {
            compression: config.compression,
            ..StorageOptions::default()
        },
    )?;
    info!(event = %Event::StorageSelected, target = %config.target, root = %target.root);

    let progress = Progress::new(config.progress);
    Ok(DumpManager::run(config, Box::new(database), target, &progress)?)
}

/// Restore into the database in `db` according to `config`
pub fn restore(db: &Path, config: &RestoreConfig) -> CliResult<RestoreSummary> {
    let mut database = LocalDatabase::create(db)?;
    let source = select_backend(
        &config.source,
        StorageOptions {
            compression: config.compression,
            allow_truncated_listing: config.allow_truncated_listing,
        },
    )?;
    info!(event = %Event::StorageSelected, source = %config.source, root = %source.root);

    let progress = Progress::new(config.progress);
    Ok(RestoreManager::run(config, &mut database, source, &progress)?)
}
