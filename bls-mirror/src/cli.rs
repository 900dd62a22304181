///
/// This module implements the CLI interface for bls-mirror: command parsing, the two
/// job entrypoints, and wiring of the concrete HTTP session and object store into the
/// core pipelines.
///
/// All business logic (listing, reconciliation, reporting) lives in the
/// [`bls-mirror-core`] crate. This module is strictly glue.
///
/// ## Jobs
/// - `sync`: mirror the directory index into the bucket, then mirror the JSON dataset.
/// - `report`: read the mirrored series file and dataset and print the report.
///
/// Both take their configuration from the environment (see [`crate::load_config`]) so
/// a scheduler can invoke them without any payload.
///
/// [`bls-mirror-core`]: ../../bls-mirror-core/
use crate::load_config::{load_report_sources, load_sync_settings};
use crate::store::{read_uri, ObjectStoreMirror};
use anyhow::{Context, Result};
use bls_mirror_core::config::ReportParams;
use bls_mirror_core::dataset::mirror_dataset;
use bls_mirror_core::report::build_report;
use bls_mirror_core::session::HttpSession;
use bls_mirror_core::synchronise::synchronise;
use clap::{Parser, Subcommand};

/// CLI for bls-mirror: keep an object-store mirror of a bls.gov time-series directory.
#[derive(Parser)]
#[clap(
    name = "bls-mirror",
    version,
    about = "Mirror a bls.gov time-series directory and a datausa dataset into S3, and report over the mirror"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronise the bucket with the remote directory index and dataset
    Sync,
    /// Print population statistics and series reports from the mirrored data
    Report {
        /// First year (inclusive) of the population statistics window
        #[clap(long, default_value_t = 2013)]
        from_year: i32,
        /// Last year (inclusive) of the population statistics window
        #[clap(long, default_value_t = 2018)]
        to_year: i32,
        /// Series joined against population
        #[clap(long, default_value = "PRS30006032")]
        series_id: String,
        /// Period joined against population
        #[clap(long, default_value = "Q01")]
        period: String,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync => run_sync().await,
        Commands::Report {
            from_year,
            to_year,
            series_id,
            period,
        } => {
            let params = ReportParams {
                from_year,
                to_year,
                series_id,
                period,
            };
            run_report(&params).await
        }
    }
}

async fn run_sync() -> Result<()> {
    let settings = load_sync_settings()?;
    tracing::info!(command = "sync", "Starting synchronisation process");

    let session = HttpSession::new(settings.session.clone()).context("Failed to build HTTP session")?;
    let store = ObjectStoreMirror::s3_from_env(&settings.sync.bucket)?;

    let report = match synchronise(&session, &store, &settings.sync).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(command = "sync", error = %e, "Synchronisation failed");
            return Err(anyhow::Error::new(e).context("Directory synchronisation failed"));
        }
    };
    tracing::info!(command = "sync", ?report, "Directory synchronisation complete");
    println!(
        "Synchronise complete: {} added, {} updated, {} unchanged, {} deleted, {} failed",
        report.added.len(),
        report.updated.len(),
        report.unchanged.len(),
        report.deleted.len(),
        report.failures.len()
    );

    let dataset = mirror_dataset(
        &session,
        &store,
        &settings.sync.dataset_url,
        &settings.sync.dataset_key,
    )
    .await
    .context("Dataset mirror failed")?;
    tracing::info!(command = "sync", ?dataset, "Dataset mirror complete");
    Ok(())
}

async fn run_report(params: &ReportParams) -> Result<()> {
    let sources = load_report_sources()?;
    params.trace_loaded();

    let series = read_uri(&sources.series_file).await?;
    let dataset = read_uri(&sources.dataset_file).await?;
    let report = build_report(&series, &dataset, params).context("Failed to build report")?;

    tracing::info!(command = "report", "Report complete");
    println!("{report}");
    Ok(())
}
