//! Snapshot Transfer - move tabular snapshots in and out of a blob repository
//!
//! Provides:
//! - Listing and selection of stored datasets (catalog)
//! - Staging between stored Parquet payloads and in-memory tables
//! - Export to Parquet, CSV, viewer collections, table lists and relational
//!   warehouses
//! - Ingestion of Parquet/CSV directories and in-memory tables
//! - A concurrent relational loader with connection retry

pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod relational;
pub mod sql;
pub mod staging;
pub mod store;
pub mod table;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod logging;

pub use catalog::{Catalog, Selection, SortOrder};
pub use config::TransferConfig;
pub use error::{TransferError, TransferResult};
pub use export::{ExportFormat, ExportOutcome, Exporter};
pub use ingest::{IngestSource, IngestStats, Ingestor};
pub use relational::{LoadError, LoadReport, LoaderConfig, RelationalLoader};
#[cfg(feature = "postgres-backend")]
pub use relational::{PostgresConnection, PostgresConnector};
pub use staging::{StagedFile, StagingArea};
#[cfg(feature = "duckdb-backend")]
pub use store::DuckDbStore;
pub use store::{BlobStore, DocumentStore, FileRecord, StoreError, StoreResult};
pub use table::{DataTable, NamedTable};
