//! GeoTIFF band labeling and band reads, via GDAL.

use std::path::Path;

use gdal::{Dataset, DatasetOptions, GdalOpenFlags, Metadata};

use crate::error::RasterError;

pub fn open(path: &Path) -> Result<Dataset, RasterError> {
    Ok(Dataset::open(path)?)
}

/// Reopens `path` in update mode and assigns `bands` as the per-band
/// descriptions, in order. The raster must carry exactly one band per label.
pub fn set_band_descriptions(path: &Path, bands: &[String]) -> Result<(), RasterError> {
    let dataset = Dataset::open_ex(
        path,
        DatasetOptions {
            open_flags: GdalOpenFlags::GDAL_OF_UPDATE,
            ..Default::default()
        },
    )?;

    let found = dataset.raster_count() as usize;
    if found != bands.len() {
        return Err(RasterError::BandCountMismatch {
            expected: bands.len(),
            found,
        });
    }

    for (index, band_name) in bands.iter().enumerate() {
        let mut band = dataset.rasterband(index as isize + 1)?;
        band.set_description(band_name)?;
    }
    Ok(())
}

pub fn band_descriptions(path: &Path) -> Result<Vec<String>, RasterError> {
    let dataset = open(path)?;
    let mut descriptions = Vec::new();
    for index in 1..=dataset.raster_count() {
        descriptions.push(dataset.rasterband(index)?.description()?);
    }
    Ok(descriptions)
}

/// Whole-band read as `f32`, row-major.
pub fn read_band_f32(dataset: &Dataset, index: isize) -> Result<Vec<f32>, RasterError> {
    let buffer = dataset.rasterband(index)?.read_band_as::<f32>()?;
    Ok(buffer.data)
}

/// Writes a small multi-band GeoTIFF for tests elsewhere in the crate.
#[cfg(test)]
pub(crate) fn write_test_raster(path: &Path, bands: usize) -> Result<(), RasterError> {
    use gdal::raster::Buffer;
    use gdal::DriverManager;

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let dataset = driver.create_with_band_type::<u16, _>(path, 4, 4, bands as isize)?;
    for index in 1..=bands {
        let values: Vec<u16> = (0..16).map(|cell| (cell * index + 1) as u16).collect();
        let mut band = dataset.rasterband(index as isize)?;
        band.write((0, 0), (4, 4), &Buffer::new((4, 4), values))?;
    }
    Ok(())
}
