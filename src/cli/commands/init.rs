//! `init` command: write a starter configuration file

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::config::sample_config;
use crate::error::TransferError;

/// Arguments for the `init` command
pub struct InitArgs {
    /// Where to write the configuration file
    pub path: PathBuf,
    /// Overwrite an existing file
    pub force: bool,
}

/// Handle the `init` command
pub fn handle_init(args: &InitArgs) -> Result<(), CliError> {
    if args.path.exists() && !args.force {
        println!("Configuration already exists at: {}", args.path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    std::fs::write(&args.path, sample_config()).map_err(|e| TransferError::io(&args.path, e))?;
    println!("Configuration written to: {}", args.path.display());

    Ok(())
}
