//! In-memory tabular objects
//!
//! A [`DataTable`] is the transient form of a dataset: it is produced by
//! decoding a stored Parquet payload or supplied directly by a caller for
//! ingestion. It is never persisted as-is; the staging codec always turns it
//! into Parquet first.

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::concat_batches;
use arrow::datatypes::{Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

/// A named dataset paired with its decoded table
pub type NamedTable = (String, DataTable);

/// In-memory table with named, typed columns
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    batch: RecordBatch,
}

impl DataTable {
    /// Wrap a single record batch
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// A table with no columns and no rows
    pub fn empty() -> Self {
        Self::empty_with_schema(Arc::new(Schema::empty()))
    }

    /// A zero-row table with the given columns
    pub fn empty_with_schema(schema: SchemaRef) -> Self {
        Self {
            batch: RecordBatch::new_empty(schema),
        }
    }

    /// Concatenate batches sharing `schema` into one table
    pub fn from_batches(schema: SchemaRef, batches: &[RecordBatch]) -> Result<Self, ArrowError> {
        if batches.is_empty() {
            return Ok(Self::empty_with_schema(schema));
        }
        let batch = concat_batches(&schema, batches)?;
        Ok(Self { batch })
    }

    /// Build a table from `(column name, array)` pairs
    ///
    /// At least one column is required; use [`DataTable::empty`] for a table
    /// without columns.
    pub fn try_from_columns<I, S>(columns: I) -> Result<Self, ArrowError>
    where
        I: IntoIterator<Item = (S, ArrayRef)>,
        S: AsRef<str>,
    {
        let batch = RecordBatch::try_from_iter(columns)?;
        Ok(Self { batch })
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// True when the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn column(&self, index: usize) -> &ArrayRef {
        self.batch.column(index)
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }
}

impl From<RecordBatch> for DataTable {
    fn from(batch: RecordBatch) -> Self {
        Self::new(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, StringArray};

    #[test]
    fn test_empty_table_has_no_columns_or_rows() {
        let table = DataTable::empty();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_columns(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_columns_keeps_order() {
        let table = DataTable::try_from_columns(vec![
            ("id", Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef),
            ("amount", Arc::new(Float64Array::from(vec![1.5, 2.5])) as ArrayRef),
        ])
        .unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column_names(), vec!["id", "amount"]);
    }

    #[test]
    fn test_from_batches_concatenates() {
        let first = DataTable::try_from_columns(vec![(
            "id",
            Arc::new(StringArray::from(vec!["a"])) as ArrayRef,
        )])
        .unwrap();
        let second = DataTable::try_from_columns(vec![(
            "id",
            Arc::new(StringArray::from(vec!["b", "c"])) as ArrayRef,
        )])
        .unwrap();

        let merged = DataTable::from_batches(
            first.schema(),
            &[first.batch().clone(), second.batch().clone()],
        )
        .unwrap();
        assert_eq!(merged.num_rows(), 3);
    }

    #[test]
    fn test_from_no_batches_is_empty_with_schema() {
        let schema = DataTable::try_from_columns(vec![(
            "id",
            Arc::new(StringArray::from(vec!["a"])) as ArrayRef,
        )])
        .unwrap()
        .schema();

        let table = DataTable::from_batches(schema, &[]).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_columns(), 1);
    }
}
