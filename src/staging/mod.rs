//! Staging of datasets through transient Parquet files
//!
//! Every conversion between stored bytes, in-memory tables and output formats
//! passes through a [`StagedFile`]: a Parquet file on local storage that is
//! removed when the value is dropped, whatever the exit path. The only way to
//! keep a staged file is [`StagedFile::persist`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use snapshot_transfer::staging::StagingArea;
//!
//! let area = StagingArea::new("/tmp");
//! let staged = area.stage_bytes("sales", &payload)?;
//! let table = staged.decode()?;
//! // staged file removed here
//! ```

mod codec;
mod csv;
mod documents;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{TransferError, TransferResult};
use crate::table::DataTable;

pub use codec::{COLUMNAR_EXTENSION, read_table, write_table};
pub use csv::{CSV_EXTENSION, read_csv_as_text, write_csv};
pub use documents::to_documents;

/// Directory in which staging files are created
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Stage files under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Stage files under the system temporary directory
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Write raw Parquet bytes to a staging file
    pub fn stage_bytes(&self, name: &str, bytes: &[u8]) -> TransferResult<StagedFile> {
        let mut staged = self.create(name)?;
        staged
            .file
            .write_all(bytes)
            .and_then(|_| staged.file.flush())
            .map_err(|e| TransferError::io(staged.path(), e))?;
        Ok(staged)
    }

    /// Encode `table` as Parquet into a staging file
    pub fn stage_table(&self, name: &str, table: &DataTable) -> TransferResult<StagedFile> {
        let mut staged = self.create(name)?;
        write_table(table, staged.file.as_file_mut())?;
        Ok(staged)
    }

    fn create(&self, name: &str) -> TransferResult<StagedFile> {
        let file = tempfile::Builder::new()
            .prefix(&format!(".{}-", name))
            .suffix(&format!(".{}", COLUMNAR_EXTENSION))
            .tempfile_in(&self.dir)
            .map_err(|e| TransferError::io(&self.dir, e))?;

        tracing::debug!("Staging {} at {}", name, file.path().display());
        Ok(StagedFile { file })
    }
}

/// A transient Parquet file, removed on drop unless persisted
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Decode the staged Parquet file into a table
    pub fn decode(&self) -> TransferResult<DataTable> {
        let file = File::open(self.path()).map_err(|e| TransferError::io(self.path(), e))?;
        read_table(file)
    }

    /// Read the staged bytes back
    pub fn read_bytes(&self) -> TransferResult<Vec<u8>> {
        std::fs::read(self.path()).map_err(|e| TransferError::io(self.path(), e))
    }

    /// Keep the staged file at `dest`, replacing any file already there
    ///
    /// The kept file gets regular file permissions (`0644` on Unix) rather
    /// than the owner-only mode of a staging file.
    pub fn persist(self, dest: &Path) -> TransferResult<PathBuf> {
        self.file
            .persist(dest)
            .map_err(|e| TransferError::io(dest, e.error))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o644))
                .map_err(|e| TransferError::io(dest, e))?;
        }

        Ok(dest.to_path_buf())
    }
}
