//! Export of stored datasets to files, viewer collections, tables and
//! relational warehouses
//!
//! For each selected dataset, in selection order, the blob is fetched and
//! staged as a Parquet file, then converted to the requested format. The
//! staging file is removed as soon as the item is done (the columnar format
//! keeps it by moving it into place).
//!
//! Any error aborts the whole export; items already exported stay exported.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Selection};
use crate::error::{TransferError, TransferResult};
use crate::relational::{LoadReport, RelationalConnector, RelationalLoader};
use crate::staging::{COLUMNAR_EXTENSION, CSV_EXTENSION, StagingArea, to_documents, write_csv};
use crate::store::{BlobStore, DocumentStore};
use crate::table::NamedTable;

/// Output format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// The stored Parquet file, written as `{name}.parquet`
    Columnar,
    /// `{name}.csv` with a header row
    Csv,
    /// Documents inserted into a collection named after the dataset
    Viewer,
    /// Decoded tables returned to the caller
    TableList,
    /// Decoded tables handed to the relational loader
    Relational,
}

impl ExportFormat {
    /// Formats that write files and so need an existing target directory
    pub fn writes_files(self) -> bool {
        matches!(self, ExportFormat::Columnar | ExportFormat::Csv)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Columnar => "columnar",
            ExportFormat::Csv => "csv",
            ExportFormat::Viewer => "viewer",
            ExportFormat::TableList => "table-list",
            ExportFormat::Relational => "relational",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ExportFormat {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "columnar" | "parquet" => Ok(ExportFormat::Columnar),
            "csv" => Ok(ExportFormat::Csv),
            "viewer" | "compass" => Ok(ExportFormat::Viewer),
            "table-list" | "df" => Ok(ExportFormat::TableList),
            "relational" => Ok(ExportFormat::Relational),
            _ => Err(TransferError::Configuration(format!(
                "Unknown export format '{}'. Expected columnar, csv, viewer, table-list or relational",
                s
            ))),
        }
    }
}

/// Result of an export
#[derive(Debug)]
pub enum ExportOutcome {
    /// Names exported as files or viewer collections, in order
    Exported(Vec<String>),
    /// Decoded tables, in order
    Tables(Vec<NamedTable>),
}

impl ExportOutcome {
    /// Names of the exported datasets, in order
    pub fn names(&self) -> Vec<&str> {
        match self {
            ExportOutcome::Exported(names) => names.iter().map(String::as_str).collect(),
            ExportOutcome::Tables(tables) => tables.iter().map(|(name, _)| name.as_str()).collect(),
        }
    }

    pub fn into_tables(self) -> Vec<NamedTable> {
        match self {
            ExportOutcome::Exported(_) => Vec::new(),
            ExportOutcome::Tables(tables) => tables,
        }
    }
}

/// Reads selected datasets out of the blob store
pub struct Exporter<'a> {
    blobs: &'a dyn BlobStore,
    documents: &'a dyn DocumentStore,
    staging_dir: Option<PathBuf>,
}

impl<'a> Exporter<'a> {
    pub fn new(blobs: &'a dyn BlobStore, documents: &'a dyn DocumentStore) -> Self {
        Self {
            blobs,
            documents,
            staging_dir: None,
        }
    }

    /// Stage non-file exports under `dir` instead of the target directory
    pub fn with_staging_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.staging_dir = dir;
        self
    }

    /// Export the selected datasets
    ///
    /// `target_dir` is required and must exist for the file formats; the
    /// other formats default to the current directory. Use
    /// [`Exporter::export_relational`] for the relational format.
    pub fn export(
        &self,
        selection: &Selection,
        format: ExportFormat,
        target_dir: Option<&Path>,
    ) -> TransferResult<ExportOutcome> {
        if format == ExportFormat::Relational {
            return Err(TransferError::Configuration(
                "Relational export needs a warehouse loader; use export_relational".to_string(),
            ));
        }
        self.run(selection, format, target_dir)
    }

    /// Decode the selected datasets and load them into the warehouse
    pub async fn export_relational<C: RelationalConnector>(
        &self,
        selection: &Selection,
        loader: &RelationalLoader<C>,
    ) -> TransferResult<LoadReport> {
        let tables = self
            .run(selection, ExportFormat::Relational, None)?
            .into_tables();
        Ok(loader.load(tables).await)
    }

    fn run(
        &self,
        selection: &Selection,
        format: ExportFormat,
        target_dir: Option<&Path>,
    ) -> TransferResult<ExportOutcome> {
        let target = resolve_target_dir(format, target_dir)?;
        let staging = match (&self.staging_dir, format.writes_files()) {
            (Some(dir), false) => StagingArea::new(dir.clone()),
            _ => StagingArea::new(target.clone()),
        };

        let names = Catalog::new(self.blobs, self.documents).list(selection)?;
        tracing::info!("Exporting {} snapshots as {}", names.len(), format);

        let mut exported = Vec::new();
        let mut tables = Vec::new();
        for (i, name) in names.into_iter().enumerate() {
            let payload = self.blobs.get(&name)?;
            let staged = staging.stage_bytes(&name, &payload)?;

            match format {
                ExportFormat::Columnar => {
                    let dest = target.join(format!("{}.{}", name, COLUMNAR_EXTENSION));
                    staged.persist(&dest)?;
                }
                ExportFormat::Csv => {
                    let table = staged.decode()?;
                    write_csv(&table, &target.join(format!("{}.{}", name, CSV_EXTENSION)))?;
                }
                ExportFormat::Viewer => {
                    let documents = to_documents(&staged.decode()?)?;
                    if documents.is_empty() {
                        tracing::info!("{} has no rows, nothing inserted", name);
                    } else {
                        self.documents.insert_documents(&name, &documents)?;
                    }
                }
                ExportFormat::TableList | ExportFormat::Relational => {
                    let table = staged.decode()?;
                    tables.push((name.clone(), table));
                }
            }

            tracing::info!("{:5}{}", format!("{}.", i + 1), name);
            exported.push(name);
        }

        Ok(match format {
            ExportFormat::TableList | ExportFormat::Relational => ExportOutcome::Tables(tables),
            _ => ExportOutcome::Exported(exported),
        })
    }
}

/// Directory an export writes to (and stages in)
///
/// File formats need an existing `target_dir`; the other formats fall back to
/// the current directory.
pub fn resolve_target_dir(
    format: ExportFormat,
    target_dir: Option<&Path>,
) -> TransferResult<PathBuf> {
    if format.writes_files() {
        let dir = target_dir.ok_or_else(|| {
            TransferError::Configuration(format!(
                "A target directory is required for {} export",
                format
            ))
        })?;
        if !dir.is_dir() {
            return Err(TransferError::Configuration(format!(
                "Target directory '{}' not found",
                dir.display()
            )));
        }
        return Ok(dir.to_path_buf());
    }

    match target_dir {
        Some(dir) if dir.is_dir() => Ok(dir.to_path_buf()),
        _ => std::env::current_dir().map_err(|e| TransferError::io(".", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_parse() {
        assert_eq!("parquet".parse::<ExportFormat>().unwrap(), ExportFormat::Columnar);
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("compass".parse::<ExportFormat>().unwrap(), ExportFormat::Viewer);
        assert_eq!("df".parse::<ExportFormat>().unwrap(), ExportFormat::TableList);
        assert_eq!(
            "relational".parse::<ExportFormat>().unwrap(),
            ExportFormat::Relational
        );
        assert!("xlsx".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::TableList.to_string(), "table-list");
    }

    #[test]
    fn test_file_formats_require_existing_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");

        for format in [ExportFormat::Columnar, ExportFormat::Csv] {
            assert!(matches!(
                resolve_target_dir(format, Some(&missing)),
                Err(TransferError::Configuration(_))
            ));
            assert!(matches!(
                resolve_target_dir(format, None),
                Err(TransferError::Configuration(_))
            ));
            assert_eq!(resolve_target_dir(format, Some(dir.path())).unwrap(), dir.path());
        }
    }

    #[test]
    fn test_other_formats_fall_back_to_current_dir() {
        let dir = TempDir::new().unwrap();
        let cwd = std::env::current_dir().unwrap();

        assert_eq!(
            resolve_target_dir(ExportFormat::Viewer, Some(&dir.path().join("missing"))).unwrap(),
            cwd
        );
        assert_eq!(resolve_target_dir(ExportFormat::TableList, None).unwrap(), cwd);
        assert_eq!(
            resolve_target_dir(ExportFormat::TableList, Some(dir.path())).unwrap(),
            dir.path()
        );
    }
}
