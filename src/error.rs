use chrono::NaiveDate;
use thiserror::Error;

/// Failures while reading or validating the run configuration. All of these
/// abort the run before any remote call is made.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read run configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid run configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("selected_bands must name at least one band")]
    EmptyBandList,
    #[error("scale must be a positive number of meters per pixel")]
    ZeroScale,
}

/// Failures while turning a boundary file into a polygon geometry. All of
/// these abort the run before any remote call is made.
#[derive(Error, Debug)]
pub enum BoundaryError {
    #[error("unsupported boundary format for '{0}': expected a .kml or .kmz file")]
    UnsupportedFormat(String),
    #[error("no .kml document found inside archive '{0}'")]
    MissingArchiveMember(String),
    #[error("no features found in the boundary document")]
    NoFeaturesFound,
    #[error("expected a polygon or multi-polygon boundary, got '{0}'")]
    UnsupportedGeometryType(String),
    #[error("polygon ring has no <coordinates> element")]
    MissingCoordinates,
    #[error("malformed coordinate tuple '{0}'")]
    InvalidCoordinate(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unable to open boundary archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("unable to parse boundary document: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Failures while resolving the image collection into per-day mosaics.
/// Fatal for the run; the binary logs the diagnostic and exits non-zero.
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("date range {start}..{end} is empty; end_date must fall after start_date")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
    #[error("unable to resolve image collection for {dataset} over {start}..{end}: {source}")]
    Query {
        dataset: String,
        start: NaiveDate,
        end: NaiveDate,
        #[source]
        source: anyhow::Error,
    },
}

/// Failures while labeling or reading an exported raster. Recoverable at
/// per-file granularity during export.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("raster has {found} bands but {expected} band labels were configured")]
    BandCountMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Failures while rendering an RGB preview. Recoverable; at most they
/// disable preview generation for the remainder of the run.
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("no RGB preview mapping for {0}")]
    UnsupportedSensor(&'static str),
    #[error("not all RGB preview bands are present in the selected bands")]
    MissingRgbBands,
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("unable to encode preview image: {0}")]
    Image(#[from] image::ImageError),
}
