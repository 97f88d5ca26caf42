//! CLI command implementations.
//!
//! Each module handles one subcommand family. Commands open the engine
//! through [`open_cortex`], print human-readable output (or JSON with
//! `--json`), and surface [`DomainError`]s to `main`, which maps them to
//! exit codes by category.

pub mod category;
pub mod init;
pub mod listing;
pub mod maintenance;
pub mod memory;
pub mod serve;
pub mod store;

use clap::ArgMatches;
use std::path::PathBuf;
use std::sync::Arc;

use cortex_engine::{
    default_data_dir, Cortex, DefaultAdapterFactory, DomainError, ErrorCategory, StoreClient,
};

/// Exit codes by error category: input 2, not-found 3, conflict 4,
/// policy 5, storage and parse failures 6.
pub fn exit_code(error: &DomainError) -> i32 {
    match error.category() {
        ErrorCategory::Input => 2,
        ErrorCategory::NotFound => 3,
        ErrorCategory::Conflict => 4,
        ErrorCategory::Policy => 5,
        ErrorCategory::Storage | ErrorCategory::Parse => 6,
    }
}

/// Resolve the data directory from `--data-dir`, the environment, or the
/// default location.
pub fn data_dir(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<String>("data-dir")
        .map(PathBuf::from)
        .unwrap_or_else(default_data_dir)
}

/// Open the engine against the configured data directory.
pub async fn open_cortex(matches: &ArgMatches) -> Result<Cortex, DomainError> {
    Cortex::load(data_dir(matches), Arc::new(DefaultAdapterFactory)).await
}

/// Open the store named by `--store`.
pub async fn open_store(matches: &ArgMatches) -> Result<StoreClient, DomainError> {
    let cortex = open_cortex(matches).await?;
    let name = matches
        .get_one::<String>("store")
        .map(String::as_str)
        .unwrap_or("default");
    cortex.get_store(name)
}
