//! CLI command implementations

pub mod delete;
pub mod drop;
pub mod export;
pub mod find;
pub mod ingest;
pub mod init;

use crate::cli::error::CliError;
use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::store::DuckDbStore;

/// Open the blob store named by the configuration
pub fn open_store(config: &TransferConfig) -> Result<DuckDbStore, CliError> {
    config.validate()?;
    let store = DuckDbStore::open(
        &config.store.path,
        &config.store.database,
        &config.store.bucket,
    )
    .map_err(TransferError::from)?;
    Ok(store)
}

/// Print names as a 1-indexed list (`1.   name`)
pub fn print_numbered<S: AsRef<str>>(names: &[S]) {
    for (i, name) in names.iter().enumerate() {
        println!("{:5}{}", format!("{}.", i + 1), name.as_ref());
    }
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Runtime(format!("Failed to start async runtime: {}", e)))
}
