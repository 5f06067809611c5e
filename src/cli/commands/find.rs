//! `find` command

use crate::catalog::{Catalog, Selection};
use crate::cli::commands::{open_store, print_numbered};
use crate::cli::error::CliError;
use crate::config::TransferConfig;

/// Arguments for the `find` command
pub struct FindArgs {
    pub config: TransferConfig,
    pub selection: Selection,
}

/// Handle the `find` command
///
/// Prints the matching dataset names and returns them.
pub fn handle_find(args: &FindArgs) -> Result<Vec<String>, CliError> {
    let store = open_store(&args.config)?;
    let names = Catalog::new(&store, &store).list(&args.selection)?;

    if names.is_empty() {
        println!("No files found.");
    }
    print_numbered(&names);

    Ok(names)
}
