//! Request-level entry points combining caches and pipelines

use crate::errors::Result;
use crate::hotspot::{hotspot_month, predict_hotspots, HotspotPrediction};
use crate::resources::{
    HotspotModelCache, HotspotModelSource, HotspotResources, MonthCache, ScoringSource,
};
use crate::scoring::{score_trip, TripScore};
use crate::time::{pickup_month, resolve_hotspot_time};
use crate::trip::TripRequest;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use taxiscore_reference::{ModelKind, Month};
use tracing::{info, instrument};

/// Scores trips with the bundle of the pickup's month.
#[derive(Debug)]
pub struct TripScoringService {
    cache: MonthCache,
}

impl TripScoringService {
    pub fn new(source: Arc<dyn ScoringSource>) -> Self {
        Self {
            cache: MonthCache::new(source),
        }
    }

    #[instrument(
        skip(self, request),
        fields(pickup = %request.pickup_zone, dropoff = %request.dropoff_zone)
    )]
    pub fn score(&self, kind: ModelKind, request: &TripRequest) -> Result<TripScore> {
        let month = pickup_month(&request.pickup_datetime)?;
        let resources = self.cache.get(month)?;
        score_trip(request, kind, &resources)
    }

    /// Load bundles ahead of the first request.
    pub fn preload(&self, months: &[Month]) -> Result<()> {
        for &month in months {
            self.cache.get(month)?;
            info!(%month, "preloaded scoring resources");
        }
        Ok(())
    }

    pub fn cached_months(&self) -> Vec<Month> {
        self.cache.cached_months()
    }
}

/// Predicts per-zone pickup demand for a point in time.
#[derive(Debug)]
pub struct HotspotService {
    resources: Arc<HotspotResources>,
    models: HotspotModelCache,
}

impl HotspotService {
    pub fn new(resources: Arc<HotspotResources>, source: Arc<dyn HotspotModelSource>) -> Self {
        Self {
            resources,
            models: HotspotModelCache::new(source),
        }
    }

    /// `time` is `YYYY-MM-DDTHH:MM:SSZ`; without it `now` truncated to the
    /// hour is used.
    #[instrument(skip(self, now))]
    pub fn predict(
        &self,
        time: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<HotspotPrediction>> {
        let local = resolve_hotspot_time(time, now)?;
        let month = hotspot_month(&local)?;
        let model = self.models.get(month)?;
        predict_hotspots(&local, &self.resources, &model)
    }

    pub fn cached_months(&self) -> Vec<Month> {
        self.models.cached_months()
    }

    pub fn resources(&self) -> &HotspotResources {
        &self.resources
    }
}
