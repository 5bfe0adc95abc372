use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use satpull::boundary;
use satpull::catalog::HttpImageryService;
use satpull::collection;
use satpull::config::RunConfig;
use satpull::export::{self, ExportParams};
use satpull::preview::PreviewState;

/// Pull per-day satellite mosaics for a field boundary and date range.
#[derive(Parser, Debug)]
#[command(name = "satpull", version, about)]
struct Cli {
    /// Path to the TOML run configuration
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = RunConfig::read(&cli.config)?;
    let region = boundary::load(&config.boundary_path)?;

    let service = HttpImageryService::new();
    let mosaics = match collection::resolve(
        &service,
        config.satellite.dataset_id(),
        &region,
        config.start_date,
        config.end_date,
        &config.selected_bands,
    )
    .await
    {
        Ok(mosaics) => mosaics,
        Err(error) => {
            error!("{error}");
            process::exit(1);
        }
    };

    info!(
        "found {} acquisition days in {} from {} to {}",
        mosaics.len(),
        config.satellite.name(),
        config.start_date,
        config.end_date
    );

    let destination = config.save_dir();
    let params = ExportParams {
        satellite: config.satellite,
        region: &region,
        bands: &config.selected_bands,
        scale: config.scale,
        destination: &destination,
    };
    let report = export::export_all(
        &service,
        &params,
        &mosaics,
        PreviewState::from_flag(config.plot_images),
    )
    .await?;

    info!(
        "exported {} of {} days ({} failed)",
        report.written.len(),
        mosaics.len(),
        report.failed.len()
    );
    Ok(())
}
