//! Per-day raster export: one download, write, and labeling pass per mosaic,
//! with per-file failure isolation.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::boundary::BoundaryGeometry;
use crate::catalog::{ImageryService, MosaicRequest};
use crate::collection::DailyMosaic;
use crate::config::Satellite;
use crate::error::RasterError;
use crate::preview::{self, PreviewState};
use crate::raster;

pub struct ExportParams<'a> {
    pub satellite: Satellite,
    pub region: &'a BoundaryGeometry,
    pub bands: &'a [String],
    pub scale: u32,
    pub destination: &'a Path,
}

#[derive(Debug)]
pub struct ExportedFile {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub bytes_written: u64,
}

#[derive(Debug)]
pub enum ExportFailure {
    /// The download reference answered with a non-200 status.
    Http { status: u16 },
    /// The raster was written but could not be labeled.
    Labeling(RasterError),
}

#[derive(Debug)]
pub struct FailedExport {
    pub date: NaiveDate,
    pub failure: ExportFailure,
}

#[derive(Debug)]
pub struct ExportReport {
    pub written: Vec<ExportedFile>,
    pub failed: Vec<FailedExport>,
    pub preview: PreviewState,
}

/// Exports every mosaic in chronological order to
/// `{destination}/{YYYY-MM-DD}.tif`, attaching band descriptions and
/// optionally rendering previews. A failed day is logged and skipped; it
/// never aborts the remaining batch.
pub async fn export_all(
    service: &impl ImageryService,
    params: &ExportParams<'_>,
    mosaics: &[DailyMosaic],
    mut preview: PreviewState,
) -> Result<ExportReport> {
    fs::create_dir_all(params.destination).with_context(|| {
        format!(
            "unable to create output directory {}",
            params.destination.display()
        )
    })?;

    let mut written = Vec::new();
    let mut failed = Vec::new();

    for mosaic in mosaics {
        let date = mosaic.date;
        let (start_ms, end_ms) = mosaic.day_window_ms();

        let url = service
            .download_url(&MosaicRequest {
                dataset: params.satellite.dataset_id(),
                region: params.region,
                bands: params.bands,
                scale: params.scale,
                start_ms,
                end_ms,
            })
            .await
            .with_context(|| format!("unable to generate a download url for {date}"))?;

        let payload = service
            .fetch(&url)
            .await
            .with_context(|| format!("download request for {date} did not complete"))?;

        if payload.status != 200 {
            warn!(%date, status = payload.status, "download failed; continuing with the remaining days");
            failed.push(FailedExport {
                date,
                failure: ExportFailure::Http {
                    status: payload.status,
                },
            });
            continue;
        }

        let path = params.destination.join(format!("{date}.tif"));
        info!("saving {}", path.display());
        let bytes_written = write_raster(&path, &payload.bytes)?;

        if let Err(error) = raster::set_band_descriptions(&path, params.bands) {
            warn!(%date, %error, "unable to attach band descriptions");
            failed.push(FailedExport {
                date,
                failure: ExportFailure::Labeling(error),
            });
            continue;
        }

        written.push(ExportedFile {
            date,
            path: path.clone(),
            bytes_written,
        });

        if preview.active() {
            match preview::render(&path, params.satellite, params.bands) {
                Ok(preview_path) => info!("saved preview {}", preview_path.display()),
                Err(error) => {
                    // The raster stays on disk regardless
                    warn!(%date, %error, "preview generation failed");
                    preview = preview.after_failure(&error);
                }
            }
        }
    }

    Ok(ExportReport {
        written,
        failed,
        preview,
    })
}

fn write_raster(path: &Path, bytes: &[u8]) -> Result<u64> {
    let mut file = File::create(path)
        .with_context(|| format!("unable to create output file {}", path.display()))?;
    file.write_all(bytes)?;
    Ok(bytes.len() as u64)
}
