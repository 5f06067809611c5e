//! `delete` command: drop viewer collections

use crate::catalog::{Catalog, Selection};
use crate::cli::commands::{open_store, print_numbered};
use crate::cli::error::CliError;
use crate::config::TransferConfig;

/// Arguments for the `delete` command
pub struct DeleteArgs {
    pub config: TransferConfig,
    pub selection: Selection,
}

/// Handle the `delete` command
pub fn handle_delete(args: &DeleteArgs) -> Result<Vec<String>, CliError> {
    let store = open_store(&args.config)?;

    println!(
        "Deleting these snapshots (viewer collections only) from database {}:",
        args.config.store.database
    );
    let dropped = Catalog::new(&store, &store).delete(&args.selection)?;
    print_numbered(&dropped);

    Ok(dropped)
}
