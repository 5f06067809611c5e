//! CLI-specific error types

use thiserror::Error;

use crate::error::TransferError;
use crate::relational::LoadError;
use crate::store::StoreError;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Relational load error: {0}")]
    Load(#[from] LoadError),

    #[error("{failed} of {total} tables failed to load")]
    IncompleteLoad { failed: usize, total: usize },

    #[error("Runtime error: {0}")]
    Runtime(String),
}
