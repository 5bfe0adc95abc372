//! Client-side resolution of a catalog query into per-day mosaics: fetch
//! scene metadata eagerly, bucket it by UTC calendar day, and emit one
//! mosaic per distinct day in chronological order.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime};
use tracing::warn;

use crate::boundary::BoundaryGeometry;
use crate::catalog::{ImageryService, SceneMeta, SceneQuery};
use crate::error::CollectionError;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// One calendar day's composite. Pixel-level mosaic semantics stay with the
/// remote service; this type records which scenes fall on the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyMosaic {
    pub date: NaiveDate,
    pub scene_ids: Vec<String>,
}

impl DailyMosaic {
    /// Millisecond window covering the mosaic's calendar day, `[start, end)`.
    /// `start` is also the timestamp the mosaic is tagged with.
    pub fn day_window_ms(&self) -> (i64, i64) {
        let start = self
            .date
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp_millis();
        (start, start + DAY_MS)
    }
}

/// Resolves the collection for `dataset` over `[start, end)` into one mosaic
/// per distinct acquisition day, ordered chronologically.
pub async fn resolve(
    service: &impl ImageryService,
    dataset: &str,
    region: &BoundaryGeometry,
    start: NaiveDate,
    end: NaiveDate,
    bands: &[String],
) -> Result<Vec<DailyMosaic>, CollectionError> {
    if start >= end {
        return Err(CollectionError::EmptyRange { start, end });
    }

    let scenes = service
        .search_scenes(&SceneQuery {
            dataset,
            region,
            start,
            end,
            bands,
        })
        .await
        .map_err(|source| CollectionError::Query {
            dataset: dataset.to_string(),
            start,
            end,
            source,
        })?;

    Ok(group_by_day(&scenes, start, end))
}

/// Buckets scenes by the UTC calendar day of their acquisition timestamp.
/// One mosaic per distinct day, regardless of how many scenes fall on it;
/// days outside `[start, end)` are dropped.
pub fn group_by_day(scenes: &[SceneMeta], start: NaiveDate, end: NaiveDate) -> Vec<DailyMosaic> {
    let mut days: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();

    for scene in scenes {
        let Some(timestamp) = DateTime::from_timestamp_millis(scene.time_start_ms) else {
            warn!(scene = %scene.id, "skipping scene with an unrepresentable timestamp");
            continue;
        };
        let day = timestamp.date_naive();
        if day < start || day >= end {
            continue;
        }
        days.entry(day).or_default().push(scene.id.clone());
    }

    days.into_iter()
        .map(|(date, scene_ids)| DailyMosaic { date, scene_ids })
        .collect()
}
