//! Ingestion of Parquet/CSV files and in-memory tables into the blob store
//!
//! Each input becomes one blob named after the dataset, tagged with the row
//! count at write time. Inputs whose name is already stored are skipped, so
//! re-running an ingest over the same directory is a no-op.
//!
//! Errors are isolated per item: a bad file is logged and recorded in
//! [`IngestStats::errors`] and the remaining items are still processed.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{TransferError, TransferResult};
use crate::staging::{COLUMNAR_EXTENSION, CSV_EXTENSION, StagingArea, read_csv_as_text, read_table};
use crate::store::BlobStore;
use crate::table::DataTable;

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Number of items written to the store
    pub items_ingested: usize,
    /// Number of items skipped (name already stored)
    pub items_skipped: usize,
    /// Number of rows written
    pub rows_ingested: usize,
    /// Total payload bytes written
    pub bytes_ingested: u64,
    /// Names written, in processing order
    pub ingested: Vec<String>,
    /// Names skipped, in processing order
    pub skipped: Vec<String>,
    /// Number of errors encountered
    pub errors_count: usize,
    /// List of errors (limited to first 100)
    pub errors: Vec<String>,
    /// Duration of the ingestion
    #[serde(skip)]
    pub duration: Duration,
}

impl IngestStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, name: &str, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Stored { rows, bytes } => {
                tracing::info!("Ingested {} ({} rows, {} bytes)", name, rows, bytes);
                self.items_ingested += 1;
                self.rows_ingested += rows;
                self.bytes_ingested += bytes;
                self.ingested.push(name.to_string());
            }
            ItemOutcome::Skipped => {
                tracing::info!("Skipping {}: already stored", name);
                self.items_skipped += 1;
                self.skipped.push(name.to_string());
            }
        }
    }

    /// Add an error (limited to 100)
    pub fn add_error(&mut self, error: String) {
        self.errors_count += 1;
        if self.errors.len() < 100 {
            self.errors.push(error);
        }
    }

    /// True when every item was either stored or skipped
    pub fn is_clean(&self) -> bool {
        self.errors_count == 0
    }

    /// Get rows per second throughput
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.rows_ingested as f64 / secs
        }
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let secs = self.duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }
}

enum ItemOutcome {
    Stored { rows: usize, bytes: u64 },
    Skipped,
}

/// What to ingest
#[derive(Debug, Clone)]
pub enum IngestSource {
    /// Top-level Parquet/CSV files of a directory whose file name matches
    /// `pattern` from its start
    Directory { path: PathBuf, pattern: String },
    /// In-memory tables with a parallel list of dataset names
    Tables {
        tables: Vec<DataTable>,
        names: Option<Vec<String>>,
    },
}

impl IngestSource {
    pub fn directory(path: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        IngestSource::Directory {
            path: path.into(),
            pattern: pattern.into(),
        }
    }

    pub fn tables(tables: Vec<DataTable>, names: Vec<String>) -> Self {
        IngestSource::Tables {
            tables,
            names: Some(names),
        }
    }
}

/// Input file format, from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Columnar,
    Csv,
}

impl SourceFormat {
    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            COLUMNAR_EXTENSION => Some(SourceFormat::Columnar),
            CSV_EXTENSION => Some(SourceFormat::Csv),
            _ => None,
        }
    }
}

/// A directory entry selected for ingestion
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path to the file
    pub path: PathBuf,
    /// Dataset name: the file name up to its first `.`
    pub name: String,
    pub format: SourceFormat,
}

/// Discover ingestible files in the top level of `dir`
///
/// A file qualifies when `pattern` matches the start of its file name and its
/// extension (after the last `.`) is `parquet` or `csv`. Sub-directories are
/// not scanned. Results are sorted by file name.
pub fn discover_files(dir: &Path, pattern: &str) -> TransferResult<Vec<DiscoveredFile>> {
    if !dir.is_dir() {
        return Err(TransferError::Configuration(format!(
            "Source directory '{}' not found",
            dir.display()
        )));
    }

    let matcher =
        Regex::new(&format!("^(?:{})", pattern)).map_err(|e| TransferError::InvalidPattern {
            pattern: pattern.to_string(),
            error: e.to_string(),
        })?;

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| TransferError::io(dir, e))? {
        let entry = entry.map_err(|e| TransferError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!("Skipping non UTF-8 file name {}", path.display());
            continue;
        };

        let extension = file_name.rsplit('.').next().unwrap_or_default();
        let Some(format) = SourceFormat::from_extension(extension) else {
            continue;
        };
        if !matcher.is_match(&file_name) {
            continue;
        }

        let name = file_name.split('.').next().unwrap_or_default().to_string();
        if name.is_empty() {
            tracing::warn!("Skipping {}: no dataset name", file_name);
            continue;
        }

        files.push(DiscoveredFile { path, name, format });
    }

    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

    Ok(files)
}

/// Writes new datasets into a blob store
pub struct Ingestor<'a> {
    blobs: &'a dyn BlobStore,
    staging: StagingArea,
}

impl<'a> Ingestor<'a> {
    pub fn new(blobs: &'a dyn BlobStore, staging: StagingArea) -> Self {
        Self { blobs, staging }
    }

    /// Ingest every item of `source`
    ///
    /// Only source-level problems (missing directory, invalid pattern,
    /// mismatched name list) are returned as errors; item failures are
    /// recorded in the returned stats.
    pub fn ingest(&self, source: IngestSource) -> TransferResult<IngestStats> {
        let start = Instant::now();
        let mut stats = IngestStats::new();

        match source {
            IngestSource::Directory { path, pattern } => {
                let files = discover_files(&path, &pattern)?;
                tracing::info!(
                    "Ingesting {} files from directory '{}'",
                    files.len(),
                    path.display()
                );

                for file in files {
                    match self.ingest_file(&file) {
                        Ok(outcome) => stats.record(&file.name, outcome),
                        Err(e) => {
                            tracing::warn!("Failed to ingest {}: {}", file.path.display(), e);
                            stats.add_error(format!(
                                "Failed to ingest {}: {}",
                                file.path.display(),
                                e
                            ));
                        }
                    }
                }
            }
            IngestSource::Tables { tables, names } => {
                let names = names.ok_or_else(|| {
                    TransferError::Validation(
                        "A list of dataset names is required when ingesting tables".to_string(),
                    )
                })?;
                if names.len() != tables.len() {
                    return Err(TransferError::Validation(format!(
                        "Got {} names for {} tables; the lists must have the same length",
                        names.len(),
                        tables.len()
                    )));
                }
                tracing::info!("Ingesting {} tables", tables.len());

                for (table, name) in tables.iter().zip(names) {
                    match self.ingest_table(&name, table) {
                        Ok(outcome) => stats.record(&name, outcome),
                        Err(e) => {
                            tracing::warn!("Failed to ingest table {}: {}", name, e);
                            stats.add_error(format!("Failed to ingest table {}: {}", name, e));
                        }
                    }
                }
            }
        }

        stats.duration = start.elapsed();
        Ok(stats)
    }

    fn ingest_file(&self, file: &DiscoveredFile) -> TransferResult<ItemOutcome> {
        if self.blobs.exists(&file.name)? {
            return Ok(ItemOutcome::Skipped);
        }

        match file.format {
            SourceFormat::Columnar => {
                let handle = File::open(&file.path).map_err(|e| TransferError::io(&file.path, e))?;
                let rows = read_table(handle)?.num_rows();
                let bytes = fs::read(&file.path).map_err(|e| TransferError::io(&file.path, e))?;

                self.blobs.put(&file.name, &bytes, rows as i64)?;
                Ok(ItemOutcome::Stored {
                    rows,
                    bytes: bytes.len() as u64,
                })
            }
            SourceFormat::Csv => {
                let table = read_csv_as_text(&file.path)?;
                self.store_table(&file.name, &table)
            }
        }
    }

    fn ingest_table(&self, name: &str, table: &DataTable) -> TransferResult<ItemOutcome> {
        if self.blobs.exists(name)? {
            return Ok(ItemOutcome::Skipped);
        }
        self.store_table(name, table)
    }

    fn store_table(&self, name: &str, table: &DataTable) -> TransferResult<ItemOutcome> {
        let staged = self.staging.stage_table(name, table)?;
        let bytes = staged.read_bytes()?;

        self.blobs.put(name, &bytes, table.num_rows() as i64)?;
        Ok(ItemOutcome::Stored {
            rows: table.num_rows(),
            bytes: bytes.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        writeln!(file, "id").unwrap();
    }

    #[test]
    fn test_ingest_stats() {
        let mut stats = IngestStats::new();
        stats.rows_ingested = 1000;
        stats.duration = Duration::from_secs(10);

        assert_eq!(stats.throughput(), 100.0);
        assert_eq!(stats.duration_string(), "10s");
    }

    #[test]
    fn test_ingest_stats_duration_formatting() {
        let mut stats = IngestStats::new();

        stats.duration = Duration::from_secs(90);
        assert_eq!(stats.duration_string(), "1m 30s");

        stats.duration = Duration::from_secs(3661);
        assert_eq!(stats.duration_string(), "1h 1m 1s");
    }

    #[test]
    fn test_errors_are_capped() {
        let mut stats = IngestStats::new();
        for i in 0..150 {
            stats.add_error(format!("error {}", i));
        }
        assert_eq!(stats.errors_count, 150);
        assert_eq!(stats.errors.len(), 100);
        assert!(!stats.is_clean());
    }

    #[test]
    fn test_discover_filters_by_extension_and_prefix() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "sales.csv");
        touch(dir.path(), "sales.parquet");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "report_2024.v2.csv");
        touch(dir.path(), "old_report_2024.csv");

        let files = discover_files(dir.path(), "report").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "report_2024");
        assert_eq!(files[0].format, SourceFormat::Csv);

        let all = discover_files(dir.path(), ".*").unwrap();
        let names: Vec<_> = all
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "old_report_2024.csv",
                "report_2024.v2.csv",
                "sales.csv",
                "sales.parquet"
            ]
        );
    }

    #[test]
    fn test_discover_does_not_recurse() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        touch(&nested, "inner.csv");
        touch(dir.path(), "outer.csv");

        let files = discover_files(dir.path(), ".*").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "outer");
    }

    #[test]
    fn test_discover_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = discover_files(&dir.path().join("missing"), ".*").unwrap_err();
        assert!(matches!(err, TransferError::Configuration(_)));
    }

    #[test]
    fn test_discover_invalid_pattern() {
        let dir = TempDir::new().unwrap();
        let err = discover_files(dir.path(), "[").unwrap_err();
        assert!(matches!(err, TransferError::InvalidPattern { .. }));
    }
}
