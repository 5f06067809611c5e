//! Error types shared by the transfer pipelines

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by the catalog, staging, export and ingest pipelines
#[derive(Error, Debug)]
pub enum TransferError {
    /// Missing or invalid configuration (target directory, required option)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database or warehouse unreachable
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Caller-supplied input is inconsistent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Corrupt or unsupported file during staging
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Name pattern is not a valid regular expression
    #[error("Invalid pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    /// Local filesystem failure
    #[error("IO error on {path}: {error}")]
    Io { path: PathBuf, error: String },

    /// Blob or document store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TransferError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        TransferError::Io {
            path: path.into(),
            error: error.to_string(),
        }
    }
}

impl From<arrow::error::ArrowError> for TransferError {
    fn from(e: arrow::error::ArrowError) -> Self {
        TransferError::Encoding(e.to_string())
    }
}

impl From<parquet::errors::ParquetError> for TransferError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        TransferError::Encoding(e.to_string())
    }
}

/// Result type for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;
