//! Client for the remote imagery catalog: scene metadata search, per-mosaic
//! download-URL generation, and raw raster retrieval.

use anyhow::Result;
use chrono::NaiveDate;
use futures_util::TryStreamExt;
use serde::Deserialize;
use url::Url;

use crate::boundary::BoundaryGeometry;

const CATALOG_API: &str = "https://earthengine.googleapis.com/v1";

/// One catalog scene intersecting the query region.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneMeta {
    pub id: String,
    /// Acquisition timestamp, epoch milliseconds.
    pub time_start_ms: i64,
}

#[derive(Deserialize)]
struct SceneSearchResponse {
    scenes: Vec<SceneMeta>,
}

#[derive(Deserialize)]
struct DownloadUrlResponse {
    url: String,
}

/// Scene metadata query: dataset scenes intersecting `region` with an
/// acquisition timestamp in `[start, end)`, restricted to `bands`.
pub struct SceneQuery<'a> {
    pub dataset: &'a str,
    pub region: &'a BoundaryGeometry,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bands: &'a [String],
}

/// Server-side mosaic of every scene in the `[start_ms, end_ms)` window,
/// clipped to `region`, delivered as a GeoTIFF at `scale` meters per pixel.
pub struct MosaicRequest<'a> {
    pub dataset: &'a str,
    pub region: &'a BoundaryGeometry,
    pub bands: &'a [String],
    pub scale: u32,
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Raw result of retrieving a download reference. Non-200 statuses are left
/// for the caller to handle; a single failed day must not abort a batch.
pub struct RasterPayload {
    pub status: u16,
    pub bytes: Vec<u8>,
}

pub trait ImageryService {
    async fn search_scenes(&self, query: &SceneQuery<'_>) -> Result<Vec<SceneMeta>>;

    async fn download_url(&self, request: &MosaicRequest<'_>) -> Result<String>;

    async fn fetch(&self, url: &str) -> Result<RasterPayload>;
}

pub struct HttpImageryService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImageryService {
    pub fn new() -> Self {
        Self::with_base_url(CATALOG_API)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for HttpImageryService {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageryService for HttpImageryService {
    async fn search_scenes(&self, query: &SceneQuery<'_>) -> Result<Vec<SceneMeta>> {
        let response: SceneSearchResponse = self
            .client
            .post(format!("{}/scenes:search", self.base_url))
            .json(&serde_json::json!({
                "dataset": query.dataset,
                "region": query.region.to_geojson(),
                "start_date": query.start.to_string(),
                "end_date": query.end.to_string(),
                "bands": query.bands,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.scenes)
    }

    async fn download_url(&self, request: &MosaicRequest<'_>) -> Result<String> {
        let response: DownloadUrlResponse = self
            .client
            .post(format!("{}/mosaics:downloadUrl", self.base_url))
            .json(&serde_json::json!({
                "dataset": request.dataset,
                "region": request.region.to_geojson(),
                "bands": request.bands,
                "scale": request.scale,
                "start_time_ms": request.start_ms,
                "end_time_ms": request.end_ms,
                "format": "GEO_TIFF",
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // The reference is time-limited and generated per request; make sure
        // the service handed back something fetchable.
        let url = Url::parse(&response.url)?;
        Ok(url.into())
    }

    async fn fetch(&self, url: &str) -> Result<RasterPayload> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();

        let mut bytes = Vec::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.try_next().await? {
            bytes.extend_from_slice(&chunk);
        }

        Ok(RasterPayload { status, bytes })
    }
}
