//! RGB preview rendering for exported rasters.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::config::Satellite;
use crate::error::PreviewError;
use crate::raster;

/// Whether previews are still being generated for this run. Once disabled
/// the state never re-enables, and the variant records why it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    /// Never requested by the run configuration.
    Off,
    Enabled,
    /// Fewer than three of the satellite's RGB band names were selected.
    DisabledMissingBands,
    /// The selected collection has no natural-color band mapping.
    DisabledUnsupportedSensor,
}

impl PreviewState {
    pub fn from_flag(plot_images: bool) -> Self {
        if plot_images {
            PreviewState::Enabled
        } else {
            PreviewState::Off
        }
    }

    pub fn active(self) -> bool {
        matches!(self, PreviewState::Enabled)
    }

    /// State after a render failure. Missing bands and an unsupported sensor
    /// disable previews for the rest of the run; transient raster or encode
    /// failures leave the state as it was.
    pub fn after_failure(self, error: &PreviewError) -> Self {
        match error {
            PreviewError::MissingRgbBands => PreviewState::DisabledMissingBands,
            PreviewError::UnsupportedSensor(_) => PreviewState::DisabledUnsupportedSensor,
            _ => self,
        }
    }
}

/// Renders a natural-color preview of the raster at `path`, written next to
/// it with a `.png` extension.
///
/// The three RGB channels are the satellite family's red, green, and blue
/// band names looked up in `bands` (the raster's band order). Pixel values
/// are normalized by the maximum across all three channels and clipped to
/// [0, 1].
pub fn render(path: &Path, satellite: Satellite, bands: &[String]) -> Result<PathBuf, PreviewError> {
    let rgb_bands = satellite
        .rgb_bands()
        .ok_or(PreviewError::UnsupportedSensor(satellite.name()))?;

    let indices: Vec<usize> = rgb_bands
        .iter()
        .filter_map(|name| bands.iter().position(|band| band == name))
        .collect();
    if indices.len() != 3 {
        return Err(PreviewError::MissingRgbBands);
    }

    let dataset = raster::open(path)?;
    let (width, height) = dataset.raster_size();
    let channels: Vec<Vec<f32>> = indices
        .iter()
        .map(|&band_index| raster::read_band_f32(&dataset, band_index as isize + 1))
        .collect::<Result<_, _>>()?;

    let max = channels
        .iter()
        .flatten()
        .copied()
        .fold(0.0_f32, f32::max);
    let max = if max > 0.0 { max } else { 1.0 };

    let mut pixels = Vec::with_capacity(width * height * 3);
    for offset in 0..width * height {
        for channel in &channels {
            let value = (channel[offset] / max).clamp(0.0, 1.0);
            pixels.push((value * 255.0) as u8);
        }
    }

    let preview = RgbImage::from_raw(width as u32, height as u32, pixels)
        .expect("pixel buffer matches raster dimensions");
    let output = path.with_extension("png");
    preview.save(&output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::write_test_raster;
    use tempfile::tempdir;

    fn bands(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_state_from_flag() {
        assert!(!PreviewState::from_flag(false).active());
        assert!(PreviewState::from_flag(true).active());
    }

    #[test]
    fn test_disable_is_one_way() {
        let state = PreviewState::Enabled.after_failure(&PreviewError::MissingRgbBands);
        assert_eq!(state, PreviewState::DisabledMissingBands);
        assert!(!state.active());

        let state = PreviewState::Enabled.after_failure(&PreviewError::UnsupportedSensor("CDL"));
        assert_eq!(state, PreviewState::DisabledUnsupportedSensor);
    }

    #[test]
    fn test_transient_failure_keeps_state() {
        let error = PreviewError::Raster(crate::error::RasterError::BandCountMismatch {
            expected: 3,
            found: 1,
        });
        assert_eq!(PreviewState::Enabled.after_failure(&error), PreviewState::Enabled);
    }

    #[test]
    fn test_render_writes_png_sibling() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2023-06-01.tif");
        write_test_raster(&path, 3).unwrap();

        let output = render(&path, Satellite::Sentinel2, &bands(&["B4", "B3", "B2"])).unwrap();
        assert_eq!(output, dir.path().join("2023-06-01.png"));
        assert!(output.exists());

        let preview = image::open(&output).unwrap().to_rgb8();
        assert_eq!(preview.dimensions(), (4, 4));
        // the brightest channel value normalizes to full scale; here that is
        // the last cell of the third fixture band, mapped to blue
        assert_eq!(preview.get_pixel(3, 3).0[2], 255);
    }

    #[test]
    fn test_render_missing_rgb_bands() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2023-06-01.tif");
        write_test_raster(&path, 2).unwrap();

        let result = render(&path, Satellite::Sentinel2, &bands(&["B8", "B4"]));
        assert!(matches!(result, Err(PreviewError::MissingRgbBands)));
    }

    #[test]
    fn test_render_unsupported_sensor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2023-06-01.tif");
        write_test_raster(&path, 1).unwrap();

        let result = render(&path, Satellite::Cdl, &bands(&["cropland"]));
        assert!(matches!(result, Err(PreviewError::UnsupportedSensor("CDL"))));
    }
}
