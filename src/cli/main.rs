//! CLI binary entry point for snapshot-cli

use clap::{Args, Parser, Subcommand};
use snapshot_transfer::catalog::{Selection, SortOrder};
use snapshot_transfer::cli::commands::delete::{DeleteArgs, handle_delete};
use snapshot_transfer::cli::commands::drop::{DropArgs, handle_drop};
use snapshot_transfer::cli::commands::export::{ExportArgs, handle_export};
use snapshot_transfer::cli::commands::find::{FindArgs, handle_find};
use snapshot_transfer::cli::commands::ingest::{IngestArgs, handle_ingest};
use snapshot_transfer::cli::commands::init::{InitArgs, handle_init};
use snapshot_transfer::cli::error::CliError;
use snapshot_transfer::config::{CONFIG_FILENAME, TransferConfig};
use snapshot_transfer::export::ExportFormat;
use snapshot_transfer::logging::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "snapshot-cli")]
#[command(about = "Move tabular snapshots between a blob store, files and relational warehouses")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Connection and logging options shared by every command
#[derive(Args)]
struct GlobalArgs {
    /// Configuration file (defaults to ./snapshot-transfer.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the blob store file
    #[arg(long, global = true)]
    store: Option<String>,

    /// Database holding the bucket and viewer collections
    #[arg(long, global = true)]
    database: Option<String>,

    /// Bucket name
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Relational warehouse connection string
    #[arg(long, global = true)]
    relational_url: Option<String>,

    /// Relational database to connect to
    #[arg(long, global = true)]
    relational_database: Option<String>,

    /// Relational target schema
    #[arg(long, global = true)]
    relational_schema: Option<String>,

    /// Load tables one at a time with a single connection
    #[arg(long, global = true)]
    no_concurrency: bool,

    /// Number of loader workers
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Relational username
    #[arg(long, global = true)]
    username: Option<String>,

    /// Relational password
    #[arg(long, global = true)]
    password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

/// Sort and limit options shared by every selecting command
#[derive(Args)]
struct SelectionOptions {
    /// Maximum number of datasets
    #[arg(short, long)]
    limit: Option<usize>,

    /// Sort order of dataset names (asc, desc)
    #[arg(long, default_value = "asc", value_parser = parse_sort)]
    sort: SortOrder,

    /// Only datasets with at least one row
    #[arg(long)]
    non_empty: bool,
}

impl SelectionOptions {
    fn select(self, pattern: String) -> Selection {
        Selection::new(pattern)
            .with_limit(self.limit)
            .with_sort(self.sort)
            .non_empty_only(self.non_empty)
    }
}

/// Selection for `find`, matching everything unless narrowed
#[derive(Args)]
struct FindSelectionArgs {
    /// Regular expression matched against dataset names
    #[arg(short, long, default_value = ".*")]
    pattern: String,

    #[command(flatten)]
    options: SelectionOptions,
}

impl FindSelectionArgs {
    fn into_selection(self) -> Selection {
        self.options.select(self.pattern)
    }
}

/// Selection for commands that write or remove data; the pattern is mandatory
#[derive(Args)]
struct SelectionArgs {
    /// Regular expression matched against dataset names
    #[arg(short, long)]
    pattern: String,

    #[command(flatten)]
    options: SelectionOptions,
}

impl SelectionArgs {
    fn into_selection(self) -> Selection {
        self.options.select(self.pattern)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Output path
        #[arg(long, default_value = CONFIG_FILENAME)]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// List stored snapshots
    Find {
        #[command(flatten)]
        selection: FindSelectionArgs,
    },

    /// Export stored snapshots
    Export {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Output format (columnar, csv, viewer, table-list, relational)
        #[arg(short, long, value_parser = parse_format)]
        format: ExportFormat,
        /// Target directory for file formats
        #[arg(short, long)]
        target_dir: Option<PathBuf>,
    },

    /// Ingest Parquet and CSV files from a directory
    Ingest {
        /// Source directory
        #[arg(short, long)]
        source: PathBuf,
        /// Regular expression matched against the start of file names
        #[arg(short, long, default_value = ".*")]
        pattern: String,
    },

    /// Drop viewer collections for the selected snapshots
    Delete {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Permanently delete the selected snapshots from the bucket
    Drop {
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

fn parse_sort(s: &str) -> Result<SortOrder, String> {
    s.parse()
        .map_err(|_| format!("Invalid sort order: {}. Valid values: asc, desc", s))
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse().map_err(|_| {
        format!(
            "Invalid export format: {}. Valid values: columnar, csv, viewer, table-list, relational",
            s
        )
    })
}

/// Layer command-line flags over the file and environment configuration
fn build_config(global: &GlobalArgs) -> Result<TransferConfig, CliError> {
    let mut config = TransferConfig::load(global.config.as_deref())?;

    if let Some(store) = &global.store {
        config.store.path = store.clone();
    }
    if let Some(database) = &global.database {
        config.store.database = database.clone();
    }
    if let Some(bucket) = &global.bucket {
        config.store.bucket = bucket.clone();
    }

    let relational = &mut config.relational;
    if let Some(url) = &global.relational_url {
        relational.connection_string = Some(url.clone());
    }
    if let Some(database) = &global.relational_database {
        relational.database = Some(database.clone());
    }
    if let Some(schema) = &global.relational_schema {
        relational.schema = schema.clone();
    }
    if global.no_concurrency {
        relational.concurrency = false;
    }
    if let Some(workers) = global.workers {
        if workers == 0 {
            return Err(CliError::InvalidArgument(
                "--workers must be at least 1".to_string(),
            ));
        }
        relational.workers = Some(workers);
    }
    if let Some(username) = &global.username {
        relational.username = Some(username.clone());
    }
    if let Some(password) = &global.password {
        relational.password = Some(password.clone());
    }

    Ok(config)
}

fn run(cli: Cli) -> Result<(), CliError> {
    // `init` writes the configuration, so it must not require one
    if let Commands::Init { path, force } = &cli.command {
        return handle_init(&InitArgs {
            path: path.clone(),
            force: *force,
        });
    }

    let config = build_config(&cli.global)?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Find { selection } => {
            let args = FindArgs {
                config,
                selection: selection.into_selection(),
            };
            handle_find(&args).map(|_| ())
        }
        Commands::Export {
            selection,
            format,
            target_dir,
        } => {
            let args = ExportArgs {
                config,
                selection: selection.into_selection(),
                format,
                target_dir,
            };
            handle_export(&args)
        }
        Commands::Ingest { source, pattern } => {
            let args = IngestArgs {
                config,
                source,
                pattern,
            };
            handle_ingest(&args).map(|_| ())
        }
        Commands::Delete { selection } => {
            let args = DeleteArgs {
                config,
                selection: selection.into_selection(),
            };
            handle_delete(&args).map(|_| ())
        }
        Commands::Drop { selection } => {
            let args = DropArgs {
                config,
                selection: selection.into_selection(),
            };
            handle_drop(&args).map(|_| ())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.global.log_level) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
