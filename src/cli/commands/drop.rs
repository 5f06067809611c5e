//! `drop` command: permanently delete stored datasets

use crate::catalog::{Catalog, Selection};
use crate::cli::commands::{open_store, print_numbered};
use crate::cli::error::CliError;
use crate::config::TransferConfig;

/// Arguments for the `drop` command
pub struct DropArgs {
    pub config: TransferConfig,
    pub selection: Selection,
}

/// Handle the `drop` command
pub fn handle_drop(args: &DropArgs) -> Result<Vec<String>, CliError> {
    let store = open_store(&args.config)?;

    println!(
        "Permanently dropping these snapshots from {}.{}:",
        args.config.store.database, args.config.store.bucket
    );
    let dropped = Catalog::new(&store, &store).drop(&args.selection)?;
    print_numbered(&dropped);

    Ok(dropped)
}
