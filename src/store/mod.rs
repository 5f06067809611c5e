//! Blob and document store abstraction
//!
//! The transfer pipelines only see two narrow interfaces:
//! - [`BlobStore`]: large-object storage keyed by a unique string id, with a
//!   `rows` metadata field recorded per blob at write time
//! - [`DocumentStore`]: named document collections used as viewer copies
//!
//! [`DuckDbStore`] implements both on an embedded DuckDB database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDbStore;

/// Size of a stored chunk (255 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to open or reach the store
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No blob with this id
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// A blob with this id is already stored
    #[error("Blob already exists: {0}")]
    AlreadyExists(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata index record of one stored blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique identifier (the logical dataset name)
    pub id: String,
    /// Payload length in bytes
    pub length: u64,
    /// Chunk size used when the payload was written
    pub chunk_size: u64,
    /// Row count recorded at write time
    pub rows: Option<i64>,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    /// Logical name: the identifier up to its first `.`
    pub fn name(&self) -> &str {
        logical_name(&self.id)
    }
}

/// Strip any trailing format suffix from a stored identifier
pub fn logical_name(id: &str) -> &str {
    id.split('.').next().unwrap_or(id)
}

/// Large-object storage keyed by a unique string id
///
/// The store does not deduplicate on its own behalf beyond rejecting a write
/// to an id that is taken; callers check [`BlobStore::exists`] first.
pub trait BlobStore: Send + Sync {
    /// Check whether a blob with this id exists
    fn exists(&self, id: &str) -> StoreResult<bool>;

    /// Write a new blob tagged with its row count
    fn put(&self, id: &str, payload: &[u8], rows: i64) -> StoreResult<()>;

    /// Read a blob's payload
    fn get(&self, id: &str) -> StoreResult<Vec<u8>>;

    /// Delete a blob and its metadata record
    fn delete(&self, id: &str) -> StoreResult<()>;

    /// Scan the metadata index
    fn list_files(&self) -> StoreResult<Vec<FileRecord>>;
}

/// Named collections of JSON documents
pub trait DocumentStore: Send + Sync {
    /// Append documents to a collection, creating it if needed
    ///
    /// Returns the number of documents inserted.
    fn insert_documents(
        &self,
        collection: &str,
        documents: &[serde_json::Value],
    ) -> StoreResult<usize>;

    /// Read back a collection's documents in insertion order
    fn find_documents(&self, collection: &str) -> StoreResult<Vec<serde_json::Value>>;

    /// Names of all collections
    fn list_collections(&self) -> StoreResult<Vec<String>>;

    /// Drop a collection if it exists
    fn drop_collection(&self, collection: &str) -> StoreResult<()>;
}
