//! Ingestion tests against a DuckDB-backed store

#![cfg(feature = "duckdb-backend")]

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use snapshot_transfer::staging::write_table;
use snapshot_transfer::{
    BlobStore, DataTable, DuckDbStore, IngestSource, Ingestor, StagingArea, TransferError,
};
use tempfile::TempDir;

fn sample_table() -> DataTable {
    DataTable::try_from_columns(vec![
        (
            "name",
            Arc::new(StringArray::from(vec!["alpha", "beta", "gamma"])) as ArrayRef,
        ),
        (
            "score",
            Arc::new(Float64Array::from(vec![1.5, 2.0, 3.25])) as ArrayRef,
        ),
    ])
    .unwrap()
}

fn write_parquet(dir: &Path, file_name: &str, table: &DataTable) {
    let file = File::create(dir.join(file_name)).unwrap();
    write_table(table, file).unwrap();
}

fn decode(payload: &[u8]) -> DataTable {
    StagingArea::in_temp_dir()
        .stage_bytes("decoded", payload)
        .unwrap()
        .decode()
        .unwrap()
}

fn setup() -> (TempDir, DuckDbStore) {
    let dir = TempDir::new().unwrap();
    let store = DuckDbStore::in_memory("snapshots", "fs").unwrap();
    (dir, store)
}

#[test]
fn test_ingest_directory_of_parquet_and_csv() {
    let (dir, store) = setup();
    write_parquet(dir.path(), "sales.parquet", &sample_table());
    fs::write(dir.path().join("people.csv"), "id,city\n1,Oslo\n2,\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let staging = TempDir::new().unwrap();
    let ingestor = Ingestor::new(&store, StagingArea::new(staging.path()));
    let stats = ingestor
        .ingest(IngestSource::directory(dir.path(), ".*"))
        .unwrap();

    assert_eq!(stats.items_ingested, 2);
    assert_eq!(stats.rows_ingested, 5);
    assert_eq!(stats.ingested, vec!["people", "sales"]);
    assert!(stats.is_clean());

    let files = store.list_files().unwrap();
    let sales = files.iter().find(|f| f.id == "sales").unwrap();
    assert_eq!(sales.rows, Some(3));

    // Parquet payloads are stored byte for byte
    let original = fs::read(dir.path().join("sales.parquet")).unwrap();
    assert_eq!(store.get("sales").unwrap(), original);

    // CSV cells are all text
    let people = decode(&store.get("people").unwrap());
    assert_eq!(people.column_names(), vec!["id", "city"]);
    assert_eq!(people.num_rows(), 2);
    let city = people
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(city.value(0), "Oslo");

    // Staging copies do not outlive the run
    assert_eq!(fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[test]
fn test_ingest_skips_existing_names() {
    let (dir, store) = setup();
    write_parquet(dir.path(), "sales.parquet", &sample_table());

    let ingestor = Ingestor::new(&store, StagingArea::in_temp_dir());
    let first = ingestor
        .ingest(IngestSource::directory(dir.path(), ".*"))
        .unwrap();
    assert_eq!(first.items_ingested, 1);

    let second = ingestor
        .ingest(IngestSource::directory(dir.path(), ".*"))
        .unwrap();
    assert_eq!(second.items_ingested, 0);
    assert_eq!(second.items_skipped, 1);
    assert_eq!(second.skipped, vec!["sales"]);
    assert_eq!(store.list_files().unwrap().len(), 1);
}

#[test]
fn test_csv_and_parquet_with_same_name_keep_the_first() {
    let (dir, store) = setup();
    write_parquet(dir.path(), "sales.parquet", &sample_table());
    fs::write(dir.path().join("sales.csv"), "region\nnorth\n").unwrap();

    let ingestor = Ingestor::new(&store, StagingArea::in_temp_dir());
    let stats = ingestor
        .ingest(IngestSource::directory(dir.path(), ".*"))
        .unwrap();

    assert_eq!(stats.ingested, vec!["sales"]);
    assert_eq!(stats.skipped, vec!["sales"]);
    let sales = decode(&store.get("sales").unwrap());
    assert_eq!(sales.column_names(), vec!["region"]);
    assert_eq!(sales.num_rows(), 1);
}

#[test]
fn test_ingest_pattern_anchors_at_start_of_file_name() {
    let (dir, store) = setup();
    write_parquet(dir.path(), "sales_2023.parquet", &sample_table());
    write_parquet(dir.path(), "old_sales.parquet", &sample_table());

    let ingestor = Ingestor::new(&store, StagingArea::in_temp_dir());
    let stats = ingestor
        .ingest(IngestSource::directory(dir.path(), "sales"))
        .unwrap();

    assert_eq!(stats.ingested, vec!["sales_2023"]);
}

#[test]
fn test_ingest_bad_file_does_not_stop_the_batch() {
    let (dir, store) = setup();
    fs::write(dir.path().join("broken.parquet"), b"not parquet").unwrap();
    write_parquet(dir.path(), "sales.parquet", &sample_table());

    let ingestor = Ingestor::new(&store, StagingArea::in_temp_dir());
    let stats = ingestor
        .ingest(IngestSource::directory(dir.path(), ".*"))
        .unwrap();

    assert_eq!(stats.ingested, vec!["sales"]);
    assert_eq!(stats.errors_count, 1);
    assert!(stats.errors[0].contains("broken.parquet"));
    assert!(!store.exists("broken").unwrap());
}

#[test]
fn test_ingest_missing_directory() {
    let (dir, store) = setup();
    let ingestor = Ingestor::new(&store, StagingArea::in_temp_dir());

    let result = ingestor.ingest(IngestSource::directory(dir.path().join("absent"), ".*"));
    assert!(matches!(result, Err(TransferError::Configuration(_))));
}

#[test]
fn test_ingest_tables() {
    let store = DuckDbStore::in_memory("snapshots", "fs").unwrap();
    let ingestor = Ingestor::new(&store, StagingArea::in_temp_dir());

    let stats = ingestor
        .ingest(IngestSource::tables(
            vec![sample_table(), DataTable::empty()],
            vec!["scores".to_string(), "nothing".to_string()],
        ))
        .unwrap();

    assert_eq!(stats.ingested, vec!["scores", "nothing"]);
    let files = store.list_files().unwrap();
    let nothing = files.iter().find(|f| f.id == "nothing").unwrap();
    assert_eq!(nothing.rows, Some(0));

    let scores = decode(&store.get("scores").unwrap());
    assert_eq!(scores.num_rows(), 3);
    assert_eq!(scores.column_names(), vec!["name", "score"]);
}

#[test]
fn test_ingest_tables_requires_matching_names() {
    let store = DuckDbStore::in_memory("snapshots", "fs").unwrap();
    let ingestor = Ingestor::new(&store, StagingArea::in_temp_dir());

    let mismatched = ingestor.ingest(IngestSource::tables(
        vec![sample_table(), sample_table()],
        vec!["one".to_string()],
    ));
    assert!(matches!(mismatched, Err(TransferError::Validation(_))));

    let unnamed = ingestor.ingest(IngestSource::Tables {
        tables: vec![sample_table()],
        names: None,
    });
    assert!(matches!(unnamed, Err(TransferError::Validation(_))));
    assert!(store.list_files().unwrap().is_empty());
}
