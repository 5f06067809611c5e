//! `ingest` command

use std::path::PathBuf;

use crate::cli::commands::open_store;
use crate::cli::error::CliError;
use crate::config::TransferConfig;
use crate::ingest::{IngestSource, IngestStats, Ingestor};

/// Arguments for the `ingest` command
pub struct IngestArgs {
    pub config: TransferConfig,
    pub source: PathBuf,
    pub pattern: String,
}

/// Handle the `ingest` command
pub fn handle_ingest(args: &IngestArgs) -> Result<IngestStats, CliError> {
    let store = open_store(&args.config)?;
    let ingestor = Ingestor::new(&store, args.config.staging_area());

    println!("Starting ingestion from: {}", args.source.display());
    println!("Pattern: {}", args.pattern);

    let stats = ingestor.ingest(IngestSource::directory(&args.source, &args.pattern))?;

    if !stats.ingested.is_empty() {
        println!();
        println!("Ingested into {}.{}:", args.config.store.database, args.config.store.bucket);
        for (i, name) in stats.ingested.iter().enumerate() {
            println!("{:5}{}", format!("{}.", i + 1), name);
        }
    }
    if !stats.skipped.is_empty() {
        println!();
        println!("Skipped (already stored):");
        for name in &stats.skipped {
            println!("  - {}", name);
        }
    }

    println!();
    println!("Ingestion complete:");
    println!("  Datasets ingested: {}", stats.items_ingested);
    println!("  Datasets skipped:  {}", stats.items_skipped);
    println!("  Rows ingested:     {}", stats.rows_ingested);
    println!("  Bytes stored:      {} MB", stats.bytes_ingested / 1_000_000);
    println!("  Duration: {}", stats.duration_string());
    println!("  Throughput: {:.0} rows/s", stats.throughput());

    if !stats.errors.is_empty() {
        println!();
        println!("Errors ({}):", stats.errors_count);
        for error in stats.errors.iter().take(10) {
            println!("  - {}", error);
        }
        if stats.errors_count > 10 {
            println!("  ... and {} more", stats.errors_count - 10);
        }
    }

    Ok(stats)
}
