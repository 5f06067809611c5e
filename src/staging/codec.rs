//! Parquet encoding and decoding of [`DataTable`]s

use std::io::Write;

use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::ChunkReader;

use crate::error::TransferResult;
use crate::table::DataTable;

/// File extension of the columnar format
pub const COLUMNAR_EXTENSION: &str = "parquet";

/// Write `table` as a complete Parquet file into `writer`
pub fn write_table<W: Write + Send>(table: &DataTable, writer: W) -> TransferResult<()> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(writer, table.schema(), Some(props))?;
    writer.write(table.batch())?;
    writer.close()?;

    tracing::debug!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "Parquet encode completed"
    );
    Ok(())
}

/// Read a whole Parquet file into one table
pub fn read_table<R: ChunkReader + 'static>(reader: R) -> TransferResult<DataTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(reader)?;
    let schema = builder.schema().clone();
    let row_group_count = builder.metadata().num_row_groups();
    let reader = builder.build()?;

    let mut batches = Vec::with_capacity(row_group_count);
    for batch in reader {
        batches.push(batch?);
    }

    Ok(DataTable::from_batches(schema, &batches)?)
}
