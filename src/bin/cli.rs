// src/bin/cli.rs

//! ranksync CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ranksync::{
    error::Result,
    models::{Config, Credentials},
    pipeline::{self, PublishReport},
    services::HttpCatalogClient,
    storage::{LocalStorage, RankStorage},
};

/// ranksync - Catalog ranking synchronizer
#[derive(Parser, Debug)]
#[command(
    name = "ranksync",
    version,
    about = "Fetch a catalog ranking, diff it against last period and republish it"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and rank the catalog, write the output document
    Fetch,

    /// Publish an output document to the target collection
    Publish {
        /// Path to the output document (default: this year's ranking file)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Run full pipeline: Fetch → Publish
    Sync,

    /// Snapshot the previous period's collection
    Capture,

    /// Validate configuration
    Validate,

    /// Show which snapshot files would be used
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Validate config and credentials before any request goes out.
fn connect(config: &Config) -> Result<HttpCatalogClient> {
    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    let credentials = Credentials::from_env()?;
    HttpCatalogClient::new(&config.api, &credentials)
}

fn report_publish(report: &PublishReport) {
    log::info!(
        "Published {}/{} entries ({} failed)",
        report.summary.succeeded,
        report.summary.attempted(),
        report.summary.failed
    );
    if !report.summary.is_clean() {
        let ids: Vec<String> = report
            .summary
            .failures
            .iter()
            .map(|f| f.id.to_string())
            .collect();
        log::error!("Failed subject ids: {}", ids.join(", "));
    }
    if !report.description_pushed {
        log::info!("Restricted list ({} bytes) not pushed", report.description.len());
    }
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("ranksync starting...");

    let config = Config::load_or_default(&cli.config)?;
    let storage = LocalStorage::new(config.paths.clone());

    match cli.command {
        Command::Fetch => {
            let api = connect(&config)?;
            let report = pipeline::run_fetch(&config, &api, &storage).await?;
            log::info!(
                "Ranked {} items ({} normal, {} restricted) into {}",
                report.ranked.len(),
                report.ranked.normal.len(),
                report.ranked.restricted.len(),
                report.output_path.display()
            );
        }

        Command::Publish { input } => {
            let api = connect(&config)?;
            let document = storage.load_output(input.as_deref()).await?;
            log::info!(
                "Loaded ranking from {} ({} items)",
                document.metadata.fetch_date,
                document.metadata.total
            );
            let report = pipeline::run_publish(&config, &api, &storage, &document).await?;
            report_publish(&report);
        }

        Command::Sync => {
            let api = connect(&config)?;
            let report = pipeline::run_sync(&config, &api, &storage).await?;
            report_publish(&report);
        }

        Command::Capture => {
            let api = connect(&config)?;
            let summary = pipeline::run_capture(&config, &api, &storage).await?;
            log::info!(
                "Captured {} subjects of collection {} to {}",
                summary.subject_count,
                summary.collection_id,
                summary.snapshot_path.display()
            );
            if let Some(path) = &summary.ranks_path {
                log::info!("{} restricted ranks saved to {}", summary.restricted_count, path.display());
            }
        }

        Command::Validate => {
            pipeline::run_validate(&config)?;
            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Config: {}", cli.config.display());
            log::info!("Output directory: {}", config.paths.output_dir.display());

            match storage.latest_capture(config.collections.previous_id).await? {
                Some(path) => log::info!("Primary snapshot: {}", path.display()),
                None => log::info!("No primary snapshot found yet."),
            }
            match storage.latest_ranks().await? {
                Some(path) => log::info!("Restricted snapshot: {}", path.display()),
                None => log::info!("No restricted snapshot found yet."),
            }
            log::info!(
                "Credential {}: {}",
                Credentials::ENV_VAR,
                if Credentials::from_env().is_ok() {
                    "set"
                } else {
                    "not set"
                }
            );
        }
    }

    log::info!("Done!");

    Ok(())
}
