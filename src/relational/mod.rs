//! Relational loader
//!
//! Loads `(name, table)` pairs into a relational warehouse: one table per
//! dataset, recreated on every load, filled with batched multi-row inserts.
//!
//! ## Schema inference
//!
//! Column types are inferred from the *first row only*:
//! - binary value → `BYTEA`
//! - 64-bit float → `NUMERIC` (a null float still counts as a float)
//! - anything else → `TEXT`
//!
//! Every column is declared `NULL`. This is a heuristic without cross-row
//! validation: a column whose first value is atypical gets the type of that
//! value.
//!
//! ## Concurrency
//!
//! Work items are drained from a shared queue by a bounded pool of tokio
//! tasks. Each worker opens its own connection (retrying with a fixed
//! backoff), processes items until the queue is empty and then drops the
//! connection. A worker that cannot connect reports a [`LoadError`] to the
//! coordinator instead of aborting the process; items left in the queue once
//! every worker has stopped are reported as failed.

#[cfg(feature = "postgres-backend")]
pub mod postgres;

#[cfg(feature = "postgres-backend")]
pub use postgres::{PostgresConnection, PostgresConnector};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::error::ArrowError;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sql::{qualified_name, quote_ident};
use crate::table::{DataTable, NamedTable};

/// Default wait between connection attempts
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(180);

/// Default number of connection attempts per worker
pub const DEFAULT_MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Default number of rows per insert statement
pub const DEFAULT_BATCH_ROWS: usize = 1000;

/// Upper bound on bind parameters in one statement
const MAX_BIND_PARAMS: usize = 65535;

/// Errors raised while loading tables
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// A single connection attempt failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Every connection attempt failed
    #[error("Could not connect after {attempts} attempts: {last_error}")]
    ConnectExhausted { attempts: u32, last_error: String },

    /// DDL or insert failed
    #[error("Statement failed for table {table}: {error}")]
    Statement { table: String, error: String },

    /// A column could not be converted to its inferred type
    #[error("Cannot convert column {column}: {error}")]
    Conversion { column: String, error: String },

    /// A worker task panicked or was cancelled
    #[error("Worker failed: {0}")]
    Worker(String),
}

/// Relational column type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Binary,
    Numeric,
    Text,
}

impl ColumnKind {
    /// Column type used in `CREATE TABLE`
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Binary => "BYTEA",
            ColumnKind::Numeric => "NUMERIC",
            ColumnKind::Text => "TEXT",
        }
    }

    /// Type of the bind parameters carrying values of this kind
    pub fn param_type(self) -> &'static str {
        match self {
            ColumnKind::Binary => "BYTEA",
            ColumnKind::Numeric => "FLOAT8",
            ColumnKind::Text => "TEXT",
        }
    }
}

/// Tag of a cell sampled for type inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampledValue {
    Binary,
    Float,
    Other,
}

impl SampledValue {
    /// Tag the value at `row` of `column`
    pub fn of(column: &ArrayRef, row: usize) -> Self {
        match column.data_type() {
            DataType::Float64 => SampledValue::Float,
            DataType::Binary
            | DataType::LargeBinary
            | DataType::BinaryView
            | DataType::FixedSizeBinary(_)
                if column.is_valid(row) =>
            {
                SampledValue::Binary
            }
            _ => SampledValue::Other,
        }
    }
}

impl From<SampledValue> for ColumnKind {
    fn from(value: SampledValue) -> Self {
        match value {
            SampledValue::Binary => ColumnKind::Binary,
            SampledValue::Float => ColumnKind::Numeric,
            SampledValue::Other => ColumnKind::Text,
        }
    }
}

/// An inferred relational column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
}

/// Infer one column type per column from the first row of `table`
///
/// Returns an empty list for a table without rows.
pub fn infer_schema(table: &DataTable) -> Vec<ColumnDef> {
    if table.is_empty() {
        return Vec::new();
    }

    table
        .column_names()
        .into_iter()
        .enumerate()
        .map(|(i, name)| ColumnDef {
            name,
            kind: SampledValue::of(table.column(i), 0).into(),
        })
        .collect()
}

/// A bind parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Numeric(f64),
    Binary(Vec<u8>),
}

/// Convert `table` into rows of bind values following `columns`
pub fn table_rows(table: &DataTable, columns: &[ColumnDef]) -> Result<Vec<Vec<SqlValue>>, LoadError> {
    let mut rows: Vec<Vec<SqlValue>> = (0..table.num_rows())
        .map(|_| Vec::with_capacity(columns.len()))
        .collect();

    for (i, column) in columns.iter().enumerate() {
        let values = column_values(table.column(i), column.kind).map_err(|e| {
            LoadError::Conversion {
                column: column.name.clone(),
                error: e.to_string(),
            }
        })?;
        for (row, value) in rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    Ok(rows)
}

fn column_values(column: &ArrayRef, kind: ColumnKind) -> Result<Vec<SqlValue>, ArrowError> {
    match kind {
        ColumnKind::Numeric => {
            let floats = cast(column, &DataType::Float64)?;
            Ok(floats
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| v.map_or(SqlValue::Null, SqlValue::Numeric))
                .collect())
        }
        ColumnKind::Binary => {
            let binary = cast(column, &DataType::LargeBinary)?;
            Ok(binary
                .as_binary::<i64>()
                .iter()
                .map(|v| v.map_or(SqlValue::Null, |b| SqlValue::Binary(b.to_vec())))
                .collect())
        }
        ColumnKind::Text => {
            let options = FormatOptions::default();
            let formatter = ArrayFormatter::try_new(column.as_ref(), &options)?;
            Ok((0..column.len())
                .map(|row| {
                    if column.is_null(row) {
                        SqlValue::Null
                    } else {
                        SqlValue::Text(formatter.value(row).to_string())
                    }
                })
                .collect())
        }
    }
}

/// `DROP TABLE IF EXISTS` followed by `CREATE TABLE` for the inferred columns
pub fn recreate_table_sql(schema: &str, table: &str, columns: &[ColumnDef]) -> [String; 2] {
    let target = qualified_name(schema, table);
    let definitions = columns
        .iter()
        .map(|c| format!("{} {} NULL", quote_ident(&c.name), c.kind.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");

    [
        format!("DROP TABLE IF EXISTS {}", target),
        format!("CREATE TABLE {} ({})", target, definitions),
    ]
}

/// Multi-row parameterized insert for `row_count` rows
pub fn insert_sql(schema: &str, table: &str, columns: &[ColumnDef], row_count: usize) -> String {
    let names = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut param = 0;
    let tuples = (0..row_count)
        .map(|_| {
            let values = columns
                .iter()
                .map(|c| {
                    param += 1;
                    format!("${}::{}", param, c.kind.param_type())
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", values)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        qualified_name(schema, table),
        names,
        tuples
    )
}

/// Rows per insert statement so the bind parameters stay within limits
pub fn rows_per_batch(batch_rows: usize, column_count: usize) -> usize {
    let by_params = MAX_BIND_PARAMS / column_count.max(1);
    batch_rows.min(by_params).max(1)
}

/// Opens connections to the warehouse
#[async_trait]
pub trait RelationalConnector: Send + Sync + 'static {
    type Connection: RelationalConnection + 'static;

    /// Open one connection
    async fn connect(&self) -> Result<Self::Connection, LoadError>;
}

/// A single warehouse connection, owned by one worker
#[async_trait]
pub trait RelationalConnection: Send {
    /// Drop `schema.table` if it exists and create it with `columns`
    async fn recreate_table(
        &mut self,
        schema: &str,
        table: &str,
        columns: &[ColumnDef],
    ) -> Result<(), LoadError>;

    /// Insert `rows` in order; returns the number of rows inserted
    async fn insert_rows(
        &mut self,
        schema: &str,
        table: &str,
        columns: &[ColumnDef],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, LoadError>;
}

/// Connect, retrying with a fixed backoff up to `max_attempts` attempts
pub async fn connect_with_retry<C>(
    connector: &C,
    max_attempts: u32,
    backoff: Duration,
) -> Result<C::Connection, LoadError>
where
    C: RelationalConnector + ?Sized,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match connector.connect().await {
            Ok(connection) => return Ok(connection),
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    "Connection attempt {}/{} failed: {}. Retrying in {}s",
                    attempt,
                    max_attempts,
                    e,
                    backoff.as_secs()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(LoadError::ConnectExhausted {
                    attempts: attempt,
                    last_error: e.to_string(),
                });
            }
        }
    }
}

/// Loader settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Target schema for every loaded table
    pub schema: String,
    /// Size of the worker pool
    pub workers: usize,
    pub retry_backoff: Duration,
    pub max_connect_attempts: u32,
    /// Rows per insert statement
    pub batch_rows: usize,
}

impl LoaderConfig {
    /// Settings for `schema` with a pool sized for concurrent loading
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            workers: default_pool_size(),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            max_connect_attempts: DEFAULT_MAX_CONNECT_ATTEMPTS,
            batch_rows: DEFAULT_BATCH_ROWS,
        }
    }

    /// Toggle concurrency: the default pool when on, a single worker when off
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.workers = if concurrent { default_pool_size() } else { 1 };
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_retry(mut self, backoff: Duration, max_attempts: u32) -> Self {
        self.retry_backoff = backoff;
        self.max_connect_attempts = max_attempts.max(1);
        self
    }

    pub fn with_batch_rows(mut self, batch_rows: usize) -> Self {
        self.batch_rows = batch_rows.max(1);
        self
    }
}

/// Five workers per available processing unit
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 5
}

/// A table loaded successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedTable {
    pub name: String,
    pub rows: u64,
}

/// A table that could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTable {
    pub name: String,
    pub error: String,
}

/// Outcome of a load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Loaded tables, in completion order
    pub loaded: Vec<LoadedTable>,
    /// Tables skipped because they have no rows or no columns
    pub skipped: Vec<String>,
    /// Tables that failed or were never picked up
    pub failed: Vec<FailedTable>,
    /// Fatal errors of workers that could not connect
    pub worker_errors: Vec<String>,
}

impl LoadReport {
    /// True when no table failed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn loaded_names(&self) -> Vec<&str> {
        self.loaded.iter().map(|t| t.name.as_str()).collect()
    }
}

struct WorkItem {
    name: String,
    table: DataTable,
    columns: Vec<ColumnDef>,
}

type WorkQueue = Arc<Mutex<VecDeque<WorkItem>>>;

fn next_item(queue: &WorkQueue) -> Option<WorkItem> {
    queue
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .pop_front()
}

#[derive(Default)]
struct WorkerOutcome {
    loaded: Vec<LoadedTable>,
    failed: Vec<FailedTable>,
    fatal: Option<LoadError>,
}

/// Loads tables through a pool of workers
pub struct RelationalLoader<C: RelationalConnector> {
    connector: Arc<C>,
    config: Arc<LoaderConfig>,
}

impl<C: RelationalConnector> RelationalLoader<C> {
    pub fn new(connector: C, config: LoaderConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Recreate and fill one relational table per input table
    ///
    /// Tables without rows are skipped before any connection is opened. No
    /// ordering is guaranteed across tables; rows keep their input order.
    pub async fn load(&self, tables: Vec<NamedTable>) -> LoadReport {
        let mut report = LoadReport::default();

        let mut queue = VecDeque::new();
        for (name, table) in tables {
            if table.is_empty() {
                tracing::info!("Skipping {}, empty snapshot", name);
                report.skipped.push(name);
                continue;
            }
            if table.num_columns() == 0 {
                tracing::info!("Skipping {}, no columns", name);
                report.skipped.push(name);
                continue;
            }
            let columns = infer_schema(&table);
            queue.push_back(WorkItem {
                name,
                table,
                columns,
            });
        }

        if queue.is_empty() {
            return report;
        }

        let workers = self.config.workers.max(1).min(queue.len());
        tracing::info!(
            "Loading {} tables into schema {} with {} workers",
            queue.len(),
            self.config.schema,
            workers
        );

        let queue: WorkQueue = Arc::new(Mutex::new(queue));
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&self.connector),
                    Arc::clone(&queue),
                    Arc::clone(&self.config),
                ))
            })
            .collect();

        for handle in handles {
            match handle.await {
                Ok(outcome) => {
                    report.loaded.extend(outcome.loaded);
                    report.failed.extend(outcome.failed);
                    if let Some(error) = outcome.fatal {
                        report.worker_errors.push(error.to_string());
                    }
                }
                Err(e) => report.worker_errors.push(LoadError::Worker(e.to_string()).to_string()),
            }
        }

        while let Some(item) = next_item(&queue) {
            tracing::warn!("Table {} was not loaded: no worker could connect", item.name);
            report.failed.push(FailedTable {
                name: item.name,
                error: "not processed: no worker could connect".to_string(),
            });
        }

        report
    }
}

async fn run_worker<C: RelationalConnector>(
    worker: usize,
    connector: Arc<C>,
    queue: WorkQueue,
    config: Arc<LoaderConfig>,
) -> WorkerOutcome {
    let mut outcome = WorkerOutcome::default();

    let mut connection = match connect_with_retry(
        connector.as_ref(),
        config.max_connect_attempts,
        config.retry_backoff,
    )
    .await
    {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!("Worker {} giving up: {}", worker, e);
            outcome.fatal = Some(e);
            return outcome;
        }
    };

    while let Some(item) = next_item(&queue) {
        match load_table(&mut connection, &config, &item).await {
            Ok(rows) => {
                tracing::info!("Finished loading {} ({} rows)", item.name, rows);
                outcome.loaded.push(LoadedTable {
                    name: item.name,
                    rows,
                });
            }
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", item.name, e);
                outcome.failed.push(FailedTable {
                    name: item.name,
                    error: e.to_string(),
                });
            }
        }
    }

    outcome
}

async fn load_table<T: RelationalConnection>(
    connection: &mut T,
    config: &LoaderConfig,
    item: &WorkItem,
) -> Result<u64, LoadError> {
    connection
        .recreate_table(&config.schema, &item.name, &item.columns)
        .await?;

    let rows = table_rows(&item.table, &item.columns)?;
    let batch = rows_per_batch(config.batch_rows, item.columns.len());

    let mut inserted = 0;
    for chunk in rows.chunks(batch) {
        inserted += connection
            .insert_rows(&config.schema, &item.name, &item.columns, chunk)
            .await?;
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BinaryArray, Float64Array, Int64Array, StringArray};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Warehouse {
        tables: HashMap<String, (Vec<ColumnDef>, Vec<Vec<SqlValue>>)>,
        ddl: Vec<String>,
    }

    struct MockConnector {
        failures_left: AtomicU32,
        connections_left: AtomicU32,
        attempts: AtomicU32,
        warehouse: Arc<Mutex<Warehouse>>,
    }

    impl MockConnector {
        fn failing(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                connections_left: AtomicU32::new(u32::MAX),
                attempts: AtomicU32::new(0),
                warehouse: Arc::new(Mutex::new(Warehouse::default())),
            }
        }

        /// Accepts one connection and refuses every later attempt
        fn single_connection() -> Self {
            Self {
                connections_left: AtomicU32::new(1),
                ..Self::failing(0)
            }
        }
    }

    struct MockConnection {
        warehouse: Arc<Mutex<Warehouse>>,
    }

    #[async_trait]
    impl RelationalConnector for MockConnector {
        type Connection = MockConnection;

        async fn connect(&self) -> Result<MockConnection, LoadError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(LoadError::Connection("refused".to_string()));
            }
            if self
                .connections_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
            {
                return Err(LoadError::Connection("too many clients".to_string()));
            }
            Ok(MockConnection {
                warehouse: Arc::clone(&self.warehouse),
            })
        }
    }

    #[async_trait]
    impl RelationalConnection for MockConnection {
        async fn recreate_table(
            &mut self,
            _schema: &str,
            table: &str,
            columns: &[ColumnDef],
        ) -> Result<(), LoadError> {
            let mut warehouse = self.warehouse.lock().unwrap();
            warehouse.ddl.push(table.to_string());
            warehouse
                .tables
                .insert(table.to_string(), (columns.to_vec(), Vec::new()));
            Ok(())
        }

        async fn insert_rows(
            &mut self,
            _schema: &str,
            table: &str,
            _columns: &[ColumnDef],
            rows: &[Vec<SqlValue>],
        ) -> Result<u64, LoadError> {
            let mut warehouse = self.warehouse.lock().unwrap();
            let entry = warehouse.tables.get_mut(table).unwrap();
            entry.1.extend(rows.iter().cloned());
            Ok(rows.len() as u64)
        }
    }

    fn fast_config() -> LoaderConfig {
        LoaderConfig::new("dbo").with_retry(Duration::from_millis(1), 3)
    }

    fn ids(n: usize) -> DataTable {
        let values: Vec<String> = (0..n).map(|i| format!("row{}", i)).collect();
        DataTable::try_from_columns(vec![(
            "id",
            Arc::new(StringArray::from(values)) as ArrayRef,
        )])
        .unwrap()
    }

    #[test]
    fn test_infer_schema_from_first_row() {
        let table = DataTable::try_from_columns(vec![
            (
                "payload",
                Arc::new(BinaryArray::from_vec(vec![b"ab".as_ref(), b"c".as_ref()])) as ArrayRef,
            ),
            (
                "amount",
                Arc::new(Float64Array::from(vec![None, Some(2.0)])) as ArrayRef,
            ),
            ("count", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            (
                "maybe_bytes",
                Arc::new(BinaryArray::from_opt_vec(vec![None, Some(b"x".as_ref())])) as ArrayRef,
            ),
        ])
        .unwrap();

        let kinds: Vec<_> = infer_schema(&table).into_iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Binary,
                ColumnKind::Numeric,
                ColumnKind::Text,
                ColumnKind::Text
            ]
        );
    }

    #[test]
    fn test_table_rows_keep_order_and_nulls() {
        let table = DataTable::try_from_columns(vec![
            (
                "id",
                Arc::new(StringArray::from(vec![Some("a"), None])) as ArrayRef,
            ),
            (
                "amount",
                Arc::new(Float64Array::from(vec![Some(1.5), None])) as ArrayRef,
            ),
            ("count", Arc::new(Int64Array::from(vec![7, 8])) as ArrayRef),
        ])
        .unwrap();
        let columns = infer_schema(&table);

        let rows = table_rows(&table, &columns).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![
                    SqlValue::Text("a".to_string()),
                    SqlValue::Numeric(1.5),
                    SqlValue::Text("7".to_string())
                ],
                vec![SqlValue::Null, SqlValue::Null, SqlValue::Text("8".to_string())],
            ]
        );
    }

    #[test]
    fn test_recreate_table_sql() {
        let columns = vec![
            ColumnDef {
                name: "id".to_string(),
                kind: ColumnKind::Text,
            },
            ColumnDef {
                name: "amount".to_string(),
                kind: ColumnKind::Numeric,
            },
        ];

        let [drop, create] = recreate_table_sql("dbo", "sales", &columns);
        assert_eq!(drop, r#"DROP TABLE IF EXISTS "dbo"."sales""#);
        assert_eq!(
            create,
            r#"CREATE TABLE "dbo"."sales" ("id" TEXT NULL, "amount" NUMERIC NULL)"#
        );

        assert_eq!(
            insert_sql("dbo", "sales", &columns, 2),
            r#"INSERT INTO "dbo"."sales" ("id", "amount") VALUES ($1::TEXT, $2::FLOAT8), ($3::TEXT, $4::FLOAT8)"#
        );
    }

    #[test]
    fn test_rows_per_batch_respects_param_limit() {
        assert_eq!(rows_per_batch(1000, 3), 1000);
        assert_eq!(rows_per_batch(100_000, 10), 6553);
        assert_eq!(rows_per_batch(0, 0), 1);
    }

    #[test]
    fn test_concurrency_toggle() {
        assert_eq!(LoaderConfig::new("dbo").with_concurrency(false).workers, 1);
        assert_eq!(
            LoaderConfig::new("dbo").with_concurrency(true).workers,
            default_pool_size()
        );
    }

    #[tokio::test]
    async fn test_connect_retries_then_succeeds() {
        let connector = MockConnector::failing(2);
        let result = connect_with_retry(&connector, 3, Duration::from_millis(1)).await;

        assert!(result.is_ok());
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_connect_exhaustion_is_typed() {
        let connector = MockConnector::failing(10);
        let result = connect_with_retry(&connector, 3, Duration::from_millis(1)).await;

        match result {
            Err(LoadError::ConnectExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            _ => panic!("expected ConnectExhausted"),
        }
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_three_tables_two_workers() {
        let connector = MockConnector::failing(0);
        let warehouse = Arc::clone(&connector.warehouse);
        let loader = RelationalLoader::new(connector, fast_config().with_workers(2));

        let report = loader
            .load(vec![
                ("a".to_string(), ids(1)),
                ("b".to_string(), ids(2)),
                ("c".to_string(), ids(3)),
            ])
            .await;

        assert!(report.is_complete());
        let mut names = report.loaded_names();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);

        let warehouse = warehouse.lock().unwrap();
        assert_eq!(warehouse.tables["a"].1.len(), 1);
        assert_eq!(warehouse.tables["b"].1.len(), 2);
        assert_eq!(warehouse.tables["c"].1.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_tables_skip_ddl() {
        let connector = MockConnector::failing(0);
        let warehouse = Arc::clone(&connector.warehouse);
        let loader = RelationalLoader::new(connector, fast_config());

        let report = loader
            .load(vec![("nothing".to_string(), DataTable::empty())])
            .await;

        assert_eq!(report.skipped, vec!["nothing"]);
        assert!(report.loaded.is_empty());
        assert!(warehouse.lock().unwrap().ddl.is_empty());
    }

    #[tokio::test]
    async fn test_rows_keep_input_order_across_batches() {
        let connector = MockConnector::failing(0);
        let warehouse = Arc::clone(&connector.warehouse);
        let loader = RelationalLoader::new(connector, fast_config().with_batch_rows(2));

        let report = loader.load(vec![("t".to_string(), ids(5))]).await;
        assert_eq!(report.loaded[0].rows, 5);

        let warehouse = warehouse.lock().unwrap();
        let values: Vec<_> = warehouse.tables["t"].1.iter().map(|r| r[0].clone()).collect();
        let expected: Vec<_> = (0..5)
            .map(|i| SqlValue::Text(format!("row{}", i)))
            .collect();
        assert_eq!(values, expected);
    }

    #[tokio::test]
    async fn test_other_workers_drain_queue_when_one_cannot_connect() {
        let connector = MockConnector::single_connection();
        let warehouse = Arc::clone(&connector.warehouse);
        let loader = RelationalLoader::new(connector, fast_config().with_workers(2));

        let report = loader
            .load(vec![
                ("a".to_string(), ids(1)),
                ("b".to_string(), ids(2)),
                ("c".to_string(), ids(3)),
            ])
            .await;

        let mut names = report.loaded_names();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(report.failed.is_empty());
        assert_eq!(report.worker_errors.len(), 1);
        assert!(report.worker_errors[0].contains("after 3 attempts"));
        assert!(report.is_complete());

        // One successful connect plus three refused attempts
        assert_eq!(loader.connector.attempts.load(Ordering::SeqCst), 4);
        assert_eq!(warehouse.lock().unwrap().tables.len(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_warehouse_reports_failures() {
        let connector = MockConnector::failing(u32::MAX);
        let loader = RelationalLoader::new(connector, fast_config().with_workers(2));

        let report = loader
            .load(vec![("a".to_string(), ids(1)), ("b".to_string(), ids(1))])
            .await;

        assert!(report.loaded.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.worker_errors.len(), 2);
        assert!(!report.is_complete());
    }
}
