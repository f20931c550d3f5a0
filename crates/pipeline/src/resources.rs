//! Model and reference bundles, loaded once and shared
//!
//! Trip scoring needs one bundle per calendar month. Hotspot prediction
//! shares one set of reference tables and loads one model per month.
//! Both caches keep whatever they load for the lifetime of the process.

use crate::errors::{PipelineError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taxiscore_gbdt::Ensemble;
use taxiscore_reference::discovery::expected_columns_file;
use taxiscore_reference::{
    hotspot_model_file, locate_expected_columns, locate_month_dir, DurationTable, ExpectedColumns,
    HotnessTable, LagTable, ModelKind, Month, PoiTable, ScoreScaler, ScoringWeights,
    TargetEncoder, ZoneDirectory,
};
use tracing::{debug, info, instrument};

/// Everything needed to score trips for one month.
#[derive(Debug)]
pub struct ScoringResources {
    pub month: Month,
    pub xgb: Ensemble,
    pub lgb: Ensemble,
    /// Loaded for reporting; scores do not use them.
    pub weights: ScoringWeights,
    pub scaler: ScoreScaler,
    pub hotness: HotnessTable,
    pub duration: DurationTable,
    pub expected_xgb: ExpectedColumns,
    pub expected_lgb: ExpectedColumns,
    pub zones: Arc<ZoneDirectory>,
}

impl ScoringResources {
    pub fn model(&self, kind: ModelKind) -> &Ensemble {
        match kind {
            ModelKind::Xgb => &self.xgb,
            ModelKind::Lgb => &self.lgb,
        }
    }

    pub fn expected_columns(&self, kind: ModelKind) -> &ExpectedColumns {
        match kind {
            ModelKind::Xgb => &self.expected_xgb,
            ModelKind::Lgb => &self.expected_lgb,
        }
    }
}

/// Where month bundles come from.
pub trait ScoringSource: Send + Sync {
    fn load(&self, month: Month) -> Result<ScoringResources>;
}

/// Loads month bundles from the folders found under a list of roots.
#[derive(Debug, Clone)]
pub struct FsScoringSource {
    roots: Vec<PathBuf>,
    zones: Arc<ZoneDirectory>,
}

impl FsScoringSource {
    pub fn new(roots: Vec<PathBuf>, zones: Arc<ZoneDirectory>) -> Self {
        Self { roots, zones }
    }
}

impl ScoringSource for FsScoringSource {
    #[instrument(skip(self), fields(month = %month))]
    fn load(&self, month: Month) -> Result<ScoringResources> {
        let files = locate_month_dir(&self.roots, month)?;
        let columns_dir = locate_expected_columns(&self.roots, &files.dir)?;

        let resources = ScoringResources {
            month,
            xgb: Ensemble::load_json(files.model(ModelKind::Xgb))?,
            lgb: Ensemble::load_json(files.model(ModelKind::Lgb))?,
            weights: ScoringWeights::load_json(&files.weights())?,
            scaler: ScoreScaler::load_json(&files.scaler())?,
            hotness: HotnessTable::load(&files.hotness())?,
            duration: DurationTable::load(&files.duration())?,
            expected_xgb: ExpectedColumns::load_json(&expected_columns_file(
                &columns_dir,
                ModelKind::Xgb,
            ))?,
            expected_lgb: ExpectedColumns::load_json(&expected_columns_file(
                &columns_dir,
                ModelKind::Lgb,
            ))?,
            zones: Arc::clone(&self.zones),
        };

        info!(
            dir = %files.dir.display(),
            xgb_trees = resources.xgb.num_trees(),
            lgb_trees = resources.lgb.num_trees(),
            hotness_entries = resources.hotness.len(),
            "loaded scoring resources"
        );
        Ok(resources)
    }
}

/// Month bundles loaded on first use and shared afterwards.
pub struct MonthCache {
    source: Arc<dyn ScoringSource>,
    months: RwLock<HashMap<Month, Arc<ScoringResources>>>,
}

impl std::fmt::Debug for MonthCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonthCache")
            .field("cached", &self.cached_months())
            .finish()
    }
}

impl MonthCache {
    pub fn new(source: Arc<dyn ScoringSource>) -> Self {
        Self {
            source,
            months: RwLock::new(HashMap::new()),
        }
    }

    /// Cached bundle for `month`, loading it on a miss.
    ///
    /// Loading happens outside the lock; when two callers race, the first
    /// bundle stored is kept and returned to both.
    pub fn get(&self, month: Month) -> Result<Arc<ScoringResources>> {
        if let Some(hit) = self.months.read().get(&month) {
            return Ok(Arc::clone(hit));
        }

        debug!(%month, "scoring resources not cached, loading");
        let loaded = Arc::new(self.source.load(month)?);
        let mut months = self.months.write();
        Ok(Arc::clone(months.entry(month).or_insert(loaded)))
    }

    pub fn cached_months(&self) -> Vec<Month> {
        let mut months: Vec<Month> = self.months.read().keys().copied().collect();
        months.sort();
        months
    }
}

/// File locations of the hotspot reference data.
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotPaths {
    pub zone_coordinates: PathBuf,
    pub poi: PathBuf,
    pub encoding_dir: PathBuf,
    pub model_features: PathBuf,
    pub models_dir: PathBuf,
    /// `historical_lags.csv`; lag features are added only when set.
    pub lags: Option<PathBuf>,
}

/// Reference data shared by every hotspot prediction.
#[derive(Debug)]
pub struct HotspotResources {
    pub zones: Arc<ZoneDirectory>,
    pub poi: PoiTable,
    pub encoder: TargetEncoder,
    pub model_features: ExpectedColumns,
    pub lags: Option<LagTable>,
    /// Hours looked back for lag features.
    pub lag_hours: Vec<u32>,
}

impl HotspotResources {
    #[instrument(skip(paths, zones))]
    pub fn load(paths: &HotspotPaths, zones: Arc<ZoneDirectory>, lag_hours: Vec<u32>) -> Result<Self> {
        let lags = paths.lags.as_deref().map(LagTable::load).transpose()?;
        let resources = Self {
            zones,
            poi: PoiTable::load(&paths.poi)?,
            encoder: TargetEncoder::load_dir(&paths.encoding_dir)?,
            model_features: ExpectedColumns::load_json(&paths.model_features)?,
            lags,
            lag_hours,
        };
        info!(
            zones = resources.zones.len(),
            poi_zones = resources.poi.len(),
            encoded_columns = resources.encoder.len(),
            features = resources.model_features.len(),
            lags = resources.lags.is_some(),
            "loaded hotspot resources"
        );
        Ok(resources)
    }
}

/// Where month-to-month hotspot models come from.
pub trait HotspotModelSource: Send + Sync {
    fn load(&self, month: Month) -> Result<Ensemble>;
}

/// Reads `hotspot_model_<m-1>_to_<m>.json` from one directory.
#[derive(Debug, Clone)]
pub struct FsHotspotModelSource {
    dir: PathBuf,
}

impl FsHotspotModelSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, month: Month) -> Option<PathBuf> {
        hotspot_model_file(month).map(|name| self.dir.join(name))
    }
}

impl HotspotModelSource for FsHotspotModelSource {
    fn load(&self, month: Month) -> Result<Ensemble> {
        let path = self
            .path_for(month)
            .ok_or_else(|| PipelineError::UnsupportedMonth(capitalize(month.full_name())))?;
        load_model(&path)
    }
}

fn load_model(path: &Path) -> Result<Ensemble> {
    let model = Ensemble::load_json(path)?;
    info!(path = %path.display(), trees = model.num_trees(), "loaded hotspot model");
    Ok(model)
}

pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Hotspot models loaded on first use and shared afterwards.
pub struct HotspotModelCache {
    source: Arc<dyn HotspotModelSource>,
    models: RwLock<HashMap<Month, Arc<Ensemble>>>,
}

impl std::fmt::Debug for HotspotModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotspotModelCache")
            .field("cached", &self.cached_months())
            .finish()
    }
}

impl HotspotModelCache {
    pub fn new(source: Arc<dyn HotspotModelSource>) -> Self {
        Self {
            source,
            models: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, month: Month) -> Result<Arc<Ensemble>> {
        if let Some(hit) = self.models.read().get(&month) {
            return Ok(Arc::clone(hit));
        }
        let loaded = Arc::new(self.source.load(month)?);
        let mut models = self.models.write();
        Ok(Arc::clone(models.entry(month).or_insert(loaded)))
    }

    pub fn cached_months(&self) -> Vec<Month> {
        let mut months: Vec<Month> = self.models.read().keys().copied().collect();
        months.sort();
        months
    }
}
