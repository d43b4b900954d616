///
/// This module implements the CLI interface for keepa: command parsing, argument
/// handling and the async entrypoint used by both `main()` and integration tests.
///
/// All business logic (collection, upload, retention) lives in the [`keepa-core`] crate.
/// This module is strictly for CLI glue and orchestration.
///
/// ## How To Use
/// - For command-line users: run the `keepa` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`keepa-core`]: ../../keepa-core/
use crate::load_config::{load_config, KeepaConfig, CONFIG_FILENAME};
use crate::storage::S3Store;
use anyhow::Result;
use clap::{Parser, Subcommand};
use keepa_core::{retention, synchronise, upload, Entry};
use std::path::PathBuf;

/// CLI for keepa: upload local directories to object storage and keep one object per month.
#[derive(Parser)]
#[clap(
    name = "keepa",
    version,
    about = "Upload configured directories to S3-compatible storage and prune dated objects to one per month"
)]
pub struct Cli {
    /// Append log output to this file instead of writing to stderr
    #[clap(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload every entry, then apply retention to every date-handling bucket
    Run {
        /// Path to the TOML config file
        #[clap(long, default_value = CONFIG_FILENAME)]
        config: PathBuf,
    },
    /// Upload every entry without touching existing objects
    Upload {
        /// Path to the TOML config file
        #[clap(long, default_value = CONFIG_FILENAME)]
        config: PathBuf,
    },
    /// Apply retention only: keep the latest object of every past month
    Retain {
        /// Path to the TOML config file
        #[clap(long, default_value = CONFIG_FILENAME)]
        config: PathBuf,
        /// Prune only this bucket instead of every date-handling entry's bucket
        #[clap(long)]
        bucket: Option<String>,
    },
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "run", "Starting upload and retention");
            let store = S3Store::new(&config.client_settings).await;
            match synchronise::synchronise(&store, &config.entries).await {
                Ok(report) => {
                    tracing::info!(
                        command = "run",
                        uploaded = report.upload.uploaded.len(),
                        failed = report.upload.failed.len(),
                        buckets_pruned = report.retention.len(),
                        "Run complete"
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "run", error = %e, "Run failed during retention");
                    Err(e.into())
                }
            }
        }
        Commands::Upload { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "upload", "Starting upload");
            let store = S3Store::new(&config.client_settings).await;
            let outcome = upload::upload(&store, &config.entries).await;
            tracing::info!(
                command = "upload",
                uploaded = outcome.uploaded.len(),
                failed = outcome.failed.len(),
                "Upload complete"
            );
            Ok(())
        }
        Commands::Retain { config, bucket } => {
            let config = load_config(config)?;
            let buckets = retention_buckets(&config, bucket);
            tracing::info!(command = "retain", buckets = buckets.len(), "Starting retention");
            let store = S3Store::new(&config.client_settings).await;
            for bucket in &buckets {
                if let Err(e) = retention::handle(&store, bucket).await {
                    tracing::error!(command = "retain", bucket = %bucket, error = %e, "Retention failed");
                    return Err(e.into());
                }
            }
            tracing::info!(command = "retain", "Retention complete");
            Ok(())
        }
    }
}

/// Buckets to prune: the one named on the command line, or every date-handling entry's.
pub fn retention_buckets(config: &KeepaConfig, bucket: Option<String>) -> Vec<String> {
    match bucket {
        Some(bucket) => vec![bucket],
        None => config
            .date_handling_entries()
            .map(|e: &Entry| e.bucket_name.clone())
            .collect(),
    }
}
