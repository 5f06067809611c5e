//! `export` command

use std::path::PathBuf;

use crate::catalog::Selection;
use crate::cli::commands::{open_store, print_numbered, runtime};
use crate::cli::error::CliError;
use crate::config::TransferConfig;
use crate::export::{ExportFormat, ExportOutcome, Exporter, resolve_target_dir};
use crate::relational::{LoadReport, PostgresConnector, RelationalLoader};

/// Arguments for the `export` command
pub struct ExportArgs {
    pub config: TransferConfig,
    pub selection: Selection,
    pub format: ExportFormat,
    pub target_dir: Option<PathBuf>,
}

/// Handle the `export` command
pub fn handle_export(args: &ExportArgs) -> Result<(), CliError> {
    if args.format == ExportFormat::Relational {
        return handle_relational_export(args);
    }

    // Fail on a bad target before touching the store
    let target = resolve_target_dir(args.format, args.target_dir.as_deref())?;
    let store = open_store(&args.config)?;
    let exporter = Exporter::new(&store, &store).with_staging_dir(args.config.staging.dir.clone());

    match exporter.export(&args.selection, args.format, Some(&target))? {
        ExportOutcome::Exported(names) => {
            if names.is_empty() {
                println!("No files found.");
                return Ok(());
            }
            match args.format {
                ExportFormat::Viewer => println!(
                    "Exported {} snapshots to viewer collections in {}:",
                    names.len(),
                    args.config.store.database
                ),
                _ => println!(
                    "Exported {} snapshots as {} to {}:",
                    names.len(),
                    args.format,
                    target.display()
                ),
            }
            print_numbered(&names);
        }
        ExportOutcome::Tables(tables) => {
            if tables.is_empty() {
                println!("No files found.");
            }
            for (i, (name, table)) in tables.iter().enumerate() {
                println!(
                    "{:5}{} ({} rows, {} columns)",
                    format!("{}.", i + 1),
                    name,
                    table.num_rows(),
                    table.num_columns()
                );
            }
        }
    }

    Ok(())
}

fn handle_relational_export(args: &ExportArgs) -> Result<(), CliError> {
    let config = &args.config;
    let connection_string = config.validate_relational()?;
    let relational = &config.relational;

    let mut connector = PostgresConnector::new(connection_string)?
        .with_credentials(relational.username.as_deref(), relational.password.as_deref());
    if let Some(database) = relational.database.as_deref() {
        connector = connector.with_database(database);
    }

    println!(
        "Loading snapshots into {} (schema {})",
        connector.connection_string_masked(),
        relational.schema
    );

    let loader = RelationalLoader::new(connector, config.loader_config());
    let store = open_store(config)?;
    let exporter = Exporter::new(&store, &store).with_staging_dir(config.staging.dir.clone());

    let report = runtime()?.block_on(exporter.export_relational(&args.selection, &loader))?;
    print_load_report(&report);

    if report.is_complete() {
        Ok(())
    } else {
        Err(CliError::IncompleteLoad {
            failed: report.failed.len(),
            total: report.loaded.len() + report.skipped.len() + report.failed.len(),
        })
    }
}

fn print_load_report(report: &LoadReport) {
    println!();
    println!("Load complete:");
    println!("  Tables loaded:  {}", report.loaded.len());
    println!("  Tables skipped: {}", report.skipped.len());
    println!("  Tables failed:  {}", report.failed.len());

    for (i, table) in report.loaded.iter().enumerate() {
        println!("{:5}{} ({} rows)", format!("{}.", i + 1), table.name, table.rows);
    }

    if !report.failed.is_empty() {
        println!();
        println!("Failures ({}):", report.failed.len());
        for failed in &report.failed {
            println!("  - {}: {}", failed.name, failed.error);
        }
    }
    if !report.worker_errors.is_empty() {
        println!();
        println!("Worker errors ({}):", report.worker_errors.len());
        for error in &report.worker_errors {
            println!("  - {}", error);
        }
    }
}
