//! Row-to-document serialization for viewer collections

use arrow::json::writer::{JsonArray, WriterBuilder};

use crate::error::{TransferError, TransferResult};
use crate::table::DataTable;

/// Serialize every row of `table` as a JSON object keyed by column name
///
/// Nulls are written explicitly so every document carries every column.
pub fn to_documents(table: &DataTable) -> TransferResult<Vec<serde_json::Value>> {
    if table.is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());
    writer.write(table.batch())?;
    writer.finish()?;

    let buffer = writer.into_inner();
    serde_json::from_slice(&buffer)
        .map_err(|e| TransferError::Encoding(format!("Failed to build documents: {}", e)))
}
