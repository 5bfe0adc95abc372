use crate::error::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml;

/// Catalog collection to pull from.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Satellite {
    Sentinel2,
    Landsat8,
    Landsat9,
    Cdl,
}

impl Satellite {
    /// Catalog dataset identifier for this collection.
    pub fn dataset_id(self) -> &'static str {
        match self {
            Satellite::Sentinel2 => "COPERNICUS/S2_SR_HARMONIZED",
            Satellite::Landsat8 => "LANDSAT/LC08/C02/T1_L2",
            Satellite::Landsat9 => "LANDSAT/LC09/C02/T1_L2",
            Satellite::Cdl => "USDA/NASS/CDL",
        }
    }

    /// Directory name used in the output layout.
    pub fn name(self) -> &'static str {
        match self {
            Satellite::Sentinel2 => "Sentinel2",
            Satellite::Landsat8 => "Landsat8",
            Satellite::Landsat9 => "Landsat9",
            Satellite::Cdl => "CDL",
        }
    }

    /// Band names composing an RGB preview, in red, green, blue order.
    /// Landsat-8 and Landsat-9 share one naming convention; the cropland
    /// layer has no natural-color rendition.
    pub fn rgb_bands(self) -> Option<[&'static str; 3]> {
        match self {
            Satellite::Sentinel2 => Some(["B4", "B3", "B2"]),
            Satellite::Landsat8 | Satellite::Landsat9 => Some(["SR_B4", "SR_B3", "SR_B2"]),
            Satellite::Cdl => None,
        }
    }
}

/// Run configuration, resolved once per invocation from a TOML file.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub boundary_path: PathBuf,
    #[serde(rename = "satellite_id")]
    pub satellite: Satellite,
    pub selected_bands: Vec<String>,
    pub output_dir: PathBuf,
    #[serde(default = "default_scale")]
    pub scale: u32,
    #[serde(default)]
    pub plot_images: bool,
    farm_name: Option<String>,
}

fn default_scale() -> u32 {
    10
}

impl RunConfig {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    #[allow(dead_code)]
    pub fn from_template(table: &toml::Table) -> Self {
        let config: Self =
            toml::from_str(&table.to_string()).expect("Error deserializing template");
        config
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.selected_bands.is_empty() {
            return Err(ConfigError::EmptyBandList);
        }
        if self.scale == 0 {
            return Err(ConfigError::ZeroScale);
        }
        Ok(())
    }

    /// Field name used in the output layout; defaults to the boundary
    /// filename stem when the configuration does not name one.
    pub fn farm_name(&self) -> String {
        match &self.farm_name {
            Some(name) => name.clone(),
            None => self
                .boundary_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "field".to_string()),
        }
    }

    /// Directory all of this run's rasters land in:
    /// `{output_dir}/{farm_name}/{satellite_name}`.
    pub fn save_dir(&self) -> PathBuf {
        self.output_dir.join(self.farm_name()).join(self.satellite.name())
    }
}

#[allow(dead_code)]
pub fn run_config_toml() -> toml::Table {
    toml::toml! {
        start_date = "2023-01-01"
        end_date = "2024-01-02"

        // A KML or KMZ file outlining the field boundary
        boundary_path = "./data/hospital_area.kmz"

        // One of "sentinel2", "landsat8", "landsat9", "cdl"
        satellite_id = "sentinel2"

        selected_bands = ["B2", "B3", "B4", "B8"]

        output_dir = "./ExtractedSatelliteData"

        // Resolution in meters per pixel
        scale = 10

        // Render an RGB preview next to each exported raster
        plot_images = false

        farm_name = "hospital_area"
    }
}
