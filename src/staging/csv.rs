//! CSV reading (all columns as text) and writing

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema};

use crate::error::{TransferError, TransferResult};
use crate::table::DataTable;

/// File extension of CSV files
pub const CSV_EXTENSION: &str = "csv";

/// Read a CSV file with a header row, decoding every column as nullable text
///
/// No type inference happens here: a column of numbers stays a column of
/// strings. Empty cells are read as nulls.
pub fn read_csv_as_text(path: &Path) -> TransferResult<DataTable> {
    let mut file = File::open(path).map_err(|e| TransferError::io(path, e))?;

    let format = Format::default().with_header(true);
    let (header, _) = format.infer_schema(&mut file, Some(0))?;
    let schema = Arc::new(Schema::new(
        header
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));

    file.seek(SeekFrom::Start(0))
        .map_err(|e| TransferError::io(path, e))?;

    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(file)?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }

    Ok(DataTable::from_batches(schema, &batches)?)
}

/// Write `table` to `path` with a header row and no index column
pub fn write_csv(table: &DataTable, path: &Path) -> TransferResult<()> {
    let file = File::create(path).map_err(|e| TransferError::io(path, e))?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(table.batch())?;
    Ok(())
}
