//! Feature alignment and scoring for taxiscore
//!
//! Turns request fields into the exact numeric vectors the offline models
//! were trained on, evaluates the models and post-processes the output.
//!
//! - `trip` / `scoring`: trip features, borough one-hots, min/max rescaling
//! - `hotspot`: per-zone rows, target encoding, `expm1` and ranking
//! - `align`: projection onto a training-time column list
//! - `resources` / `service`: per-month bundles, caches and entry points

pub mod align;
pub mod encode;
pub mod errors;
pub mod frame;
pub mod hotspot;
pub mod resources;
pub mod scoring;
pub mod service;
pub mod time;
pub mod trip;

pub use align::ColumnAligner;
pub use errors::{PipelineError, Result};
pub use frame::{FeatureRow, FeatureValue};
pub use hotspot::{predict_hotspots, HotspotPrediction};
pub use resources::{
    FsHotspotModelSource, FsScoringSource, HotspotModelCache, HotspotModelSource, HotspotPaths,
    HotspotResources, MonthCache, ScoringResources, ScoringSource,
};
pub use scoring::{normalize_score, score_trip, TripScore};
pub use service::{HotspotService, TripScoringService};
pub use taxiscore_reference::ModelKind;
pub use time::TimeOfDay;
pub use trip::TripRequest;
