//! Reference data for taxiscore
//!
//! Everything the feature pipeline reads from disk besides the models
//! themselves: the zone directory, per-month lookup tables, POI densities,
//! historical lags, target encodings, training schemas, score scalers, the
//! US holiday calendar and the zone geometry used for coordinate lookups.

pub mod discovery;
pub mod encoding;
pub mod errors;
pub mod geometry;
pub mod holidays;
pub mod lags;
pub mod lookups;
pub mod month;
pub mod poi;
pub mod scaler;
pub mod schema;
pub mod table;
pub mod zones;

pub use discovery::{
    hotspot_model_file, locate_expected_columns, locate_month_dir, ModelKind, MonthFiles,
};
pub use encoding::{encoded_column, ColumnEncoding, TargetEncoder, ENCODED_SUFFIX};
pub use errors::{ReferenceError, Result};
pub use geometry::{ProcessedZone, ZoneLocator};
pub use holidays::{is_us_holiday, us_federal_holidays, Holiday};
pub use lags::{LagTable, ProxyLags};
pub use lookups::{DurationTable, HotnessTable};
pub use month::Month;
pub use poi::PoiTable;
pub use scaler::{ScoreScaler, ScoringWeights};
pub use schema::ExpectedColumns;
pub use zones::{ZoneDirectory, ZoneRecord};
