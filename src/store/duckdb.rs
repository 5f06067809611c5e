//! DuckDB blob and document store
//!
//! Lays blobs out the way a GridFS bucket does, inside one DuckDB schema per
//! database:
//! - `"{bucket}.files"`: one metadata record per blob (`id`, `length`,
//!   `chunk_size`, `rows`, `uploaded_at`)
//! - `"{bucket}.chunks"`: the payload split into fixed-size chunks
//!
//! Viewer collections are plain tables in the same schema holding one JSON
//! document per row.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use duckdb::params;

use super::{BlobStore, DEFAULT_CHUNK_SIZE, DocumentStore, FileRecord, StoreError, StoreResult};
use crate::sql::{qualified_name, quote_ident};

/// Embedded blob store backed by DuckDB
pub struct DuckDbStore {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// Schema holding the bucket and viewer collections
    database: String,
    /// Bucket name, prefix of the files/chunks tables
    bucket: String,
    chunk_size: usize,
    /// DuckDB connection (wrapped in Mutex for thread safety)
    connection: Mutex<duckdb::Connection>,
}

impl DuckDbStore {
    /// Open (or create) a file-based store
    pub fn open(db_path: impl AsRef<Path>, database: &str, bucket: &str) -> StoreResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = duckdb::Connection::open(&path).map_err(|e| {
            StoreError::ConnectionFailed(format!(
                "Failed to open DuckDB at {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_connection(connection, Some(path), database, bucket)
    }

    /// Create an in-memory store
    ///
    /// Useful for testing or one-off transfers where persistence is not needed.
    pub fn in_memory(database: &str, bucket: &str) -> StoreResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Self::from_connection(connection, None, database, bucket)
    }

    fn from_connection(
        connection: duckdb::Connection,
        db_path: Option<PathBuf>,
        database: &str,
        bucket: &str,
    ) -> StoreResult<Self> {
        if database.is_empty() || bucket.is_empty() {
            return Err(StoreError::InvalidInput(
                "database and bucket names must not be empty".to_string(),
            ));
        }

        let store = Self {
            db_path,
            database: database.to_string(),
            bucket: bucket.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            connection: Mutex::new(connection),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Override the chunk size used for new blobs
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn files_table_name(&self) -> String {
        format!("{}.files", self.bucket)
    }

    fn chunks_table_name(&self) -> String {
        format!("{}.chunks", self.bucket)
    }

    fn files_table(&self) -> String {
        qualified_name(&self.database, &self.files_table_name())
    }

    fn chunks_table(&self) -> String {
        qualified_name(&self.database, &self.chunks_table_name())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, duckdb::Connection>> {
        self.connection
            .lock()
            .map_err(|e| StoreError::ConnectionFailed(format!("Lock error: {}", e)))
    }

    fn initialize(&self) -> StoreResult<()> {
        let sql = format!(
            r#"
            CREATE SCHEMA IF NOT EXISTS {schema};
            CREATE TABLE IF NOT EXISTS {files} (
                id VARCHAR PRIMARY KEY,
                "length" BIGINT NOT NULL,
                chunk_size BIGINT NOT NULL,
                "rows" BIGINT,
                uploaded_at VARCHAR NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {chunks} (
                files_id VARCHAR NOT NULL,
                n INTEGER NOT NULL,
                data BLOB NOT NULL
            );
            "#,
            schema = quote_ident(&self.database),
            files = self.files_table(),
            chunks = self.chunks_table(),
        );

        self.lock()?
            .execute_batch(&sql)
            .map_err(|e| StoreError::QueryFailed(format!("Failed to create bucket tables: {}", e)))
    }

    fn exists_locked(&self, conn: &duckdb::Connection, id: &str) -> StoreResult<bool> {
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE id = ?", self.files_table()),
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::QueryFailed(format!("Existence check failed: {}", e)))?;
        Ok(count > 0)
    }

    fn is_bucket_table(&self, name: &str) -> bool {
        name == self.files_table_name() || name == self.chunks_table_name()
    }

    fn check_collection(&self, collection: &str) -> StoreResult<()> {
        if collection.is_empty() || self.is_bucket_table(collection) {
            return Err(StoreError::InvalidInput(format!(
                "'{}' is not a valid collection name",
                collection
            )));
        }
        Ok(())
    }
}

impl BlobStore for DuckDbStore {
    fn exists(&self, id: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        self.exists_locked(&conn, id)
    }

    fn put(&self, id: &str, payload: &[u8], rows: i64) -> StoreResult<()> {
        let mut conn = self.lock()?;
        if self.exists_locked(&conn, id)? {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }

        let tx = conn
            .transaction()
            .map_err(|e| StoreError::QueryFailed(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            &format!(
                r#"INSERT INTO {} (id, "length", chunk_size, "rows", uploaded_at) VALUES (?, ?, ?, ?, ?)"#,
                self.files_table()
            ),
            params![
                id,
                payload.len() as i64,
                self.chunk_size as i64,
                rows,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| StoreError::QueryFailed(format!("Failed to write file record: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {} (files_id, n, data) VALUES (?, ?, ?)",
                    self.chunks_table()
                ))
                .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

            for (n, chunk) in payload.chunks(self.chunk_size).enumerate() {
                stmt.execute(params![id, n as i32, chunk.to_vec()])
                    .map_err(|e| {
                        StoreError::QueryFailed(format!("Failed to write chunk {}: {}", n, e))
                    })?;
            }
        }

        tx.commit()
            .map_err(|e| StoreError::QueryFailed(format!("Failed to commit blob: {}", e)))?;

        tracing::debug!(id, bytes = payload.len(), rows, "Stored blob");
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Vec<u8>> {
        let conn = self.lock()?;
        if !self.exists_locked(&conn, id)? {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let mut stmt = conn
            .prepare(&format!(
                "SELECT data FROM {} WHERE files_id = ? ORDER BY n",
                self.chunks_table()
            ))
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let chunks = stmt
            .query_map(params![id], |row| row.get::<_, Vec<u8>>(0))
            .map_err(|e| StoreError::QueryFailed(format!("Failed to read chunks: {}", e)))?;

        let mut payload = Vec::new();
        for chunk in chunks {
            let chunk = chunk.map_err(|e| StoreError::QueryFailed(e.to_string()))?;
            payload.extend_from_slice(&chunk);
        }

        Ok(payload)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        let mut conn = self.lock()?;
        if !self.exists_locked(&conn, id)? {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let tx = conn
            .transaction()
            .map_err(|e| StoreError::QueryFailed(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            &format!("DELETE FROM {} WHERE files_id = ?", self.chunks_table()),
            params![id],
        )
        .map_err(|e| StoreError::QueryFailed(format!("Failed to delete chunks: {}", e)))?;
        tx.execute(
            &format!("DELETE FROM {} WHERE id = ?", self.files_table()),
            params![id],
        )
        .map_err(|e| StoreError::QueryFailed(format!("Failed to delete file record: {}", e)))?;

        tx.commit()
            .map_err(|e| StoreError::QueryFailed(format!("Failed to commit delete: {}", e)))
    }

    fn list_files(&self) -> StoreResult<Vec<FileRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                r#"SELECT id, "length", chunk_size, "rows", uploaded_at FROM {}"#,
                self.files_table()
            ))
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(|e| StoreError::QueryFailed(format!("Failed to scan files: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, length, chunk_size, rows, uploaded_at) =
                row.map_err(|e| StoreError::QueryFailed(e.to_string()))?;
            let uploaded_at = DateTime::parse_from_rfc3339(&uploaded_at)
                .map_err(|e| {
                    StoreError::SerializationError(format!(
                        "Invalid upload timestamp for {}: {}",
                        id, e
                    ))
                })?
                .with_timezone(&Utc);

            records.push(FileRecord {
                id,
                length: length as u64,
                chunk_size: chunk_size as u64,
                rows,
                uploaded_at,
            });
        }

        Ok(records)
    }
}

impl DocumentStore for DuckDbStore {
    fn insert_documents(
        &self,
        collection: &str,
        documents: &[serde_json::Value],
    ) -> StoreResult<usize> {
        self.check_collection(collection)?;
        if documents.is_empty() {
            return Ok(0);
        }

        let table = qualified_name(&self.database, collection);
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::QueryFailed(format!("Failed to begin transaction: {}", e)))?;

        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (document VARCHAR NOT NULL)",
            table
        ))
        .map_err(|e| StoreError::QueryFailed(format!("Failed to create collection: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(&format!("INSERT INTO {} (document) VALUES (?)", table))
                .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

            for document in documents {
                let json = serde_json::to_string(document)
                    .map_err(|e| StoreError::SerializationError(e.to_string()))?;
                stmt.execute(params![json]).map_err(|e| {
                    StoreError::QueryFailed(format!("Failed to insert document: {}", e))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| StoreError::QueryFailed(format!("Failed to commit documents: {}", e)))?;

        Ok(documents.len())
    }

    fn find_documents(&self, collection: &str) -> StoreResult<Vec<serde_json::Value>> {
        self.check_collection(collection)?;
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT document FROM {} ORDER BY rowid",
                qualified_name(&self.database, collection)
            ))
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let mut documents = Vec::new();
        for row in rows {
            let json = row.map_err(|e| StoreError::QueryFailed(e.to_string()))?;
            documents.push(
                serde_json::from_str(&json)
                    .map_err(|e| StoreError::SerializationError(e.to_string()))?,
            );
        }
        Ok(documents)
    }

    fn list_collections(&self) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = ? ORDER BY table_name",
            )
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![self.database], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::QueryFailed(format!("Failed to list collections: {}", e)))?;

        let mut names = Vec::new();
        for row in rows {
            let name = row.map_err(|e| StoreError::QueryFailed(e.to_string()))?;
            if !self.is_bucket_table(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.check_collection(collection)?;
        self.lock()?
            .execute_batch(&format!(
                "DROP TABLE IF EXISTS {}",
                qualified_name(&self.database, collection)
            ))
            .map_err(|e| StoreError::QueryFailed(format!("Failed to drop collection: {}", e)))
    }
}
