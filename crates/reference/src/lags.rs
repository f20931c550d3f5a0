//! Historical trip counts used as proxy lag features

use crate::errors::Result;
use crate::table::{field, parse_float, parse_key, CsvTable};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Year the historical counts were collected in.
pub const REFERENCE_YEAR: i32 = 2023;

pub const ROLLING_AVG_FEATURE: &str = "rolling_avg_2h";

pub fn lag_feature_name(hours: u32) -> String {
    format!("trip_count_{hours}h_ago")
}

/// `historical_lags.csv`: trip counts by (date, hour, zone).
#[derive(Debug, Clone, Default)]
pub struct LagTable {
    counts: HashMap<(NaiveDate, u32), HashMap<String, f64>>,
}

/// Lag features for one prediction time, each keyed by zone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyLags {
    pub features: BTreeMap<String, HashMap<String, f64>>,
}

impl ProxyLags {
    pub fn value(&self, feature: &str, zone: &str) -> Option<f64> {
        self.features.get(feature)?.get(zone).copied()
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

impl LagTable {
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self> {
        let table = CsvTable::load(path)?;
        let lags = Self::from_table(&table)?;
        debug!(slots = lags.counts.len(), "loaded historical lags");
        Ok(lags)
    }

    pub fn from_table(table: &CsvTable) -> Result<Self> {
        let date = table.require("pickup_date")?;
        let hour = table.require("pickup_hour")?;
        let zone = table.require("pickup_zone")?;
        let count = table.require("trip_count")?;

        let mut counts: HashMap<(NaiveDate, u32), HashMap<String, f64>> = HashMap::new();
        let mut skipped = 0usize;
        for record in table.records() {
            let (Some(d), Some(h), Some(c)) = (
                parse_date(field(record, date)),
                parse_key(field(record, hour)),
                parse_float(field(record, count)),
            ) else {
                skipped += 1;
                continue;
            };
            // Later rows overwrite earlier ones for the same slot.
            counts
                .entry((d, h))
                .or_default()
                .insert(field(record, zone).to_string(), c);
        }
        if skipped > 0 {
            warn!(skipped, "ignored unreadable rows in historical lags");
        }
        Ok(Self { counts })
    }

    /// Counts `k` hours before `time` for each `k` in `lag_hours`, taken from
    /// the same calendar day of [`REFERENCE_YEAR`], plus their mean per zone.
    ///
    /// The hour wraps within the same day. A date that does not exist in the
    /// reference year (29 February) yields no features.
    pub fn proxy_lags(&self, time: NaiveDateTime, lag_hours: &[u32]) -> ProxyLags {
        let Some(reference_day) = time.date().with_year(REFERENCE_YEAR) else {
            return ProxyLags::default();
        };

        let mut features = BTreeMap::new();
        for &lag in lag_hours {
            let hour = (time.hour() + 24 - lag % 24) % 24;
            let slot = self
                .counts
                .get(&(reference_day, hour))
                .cloned()
                .unwrap_or_default();
            features.insert(lag_feature_name(lag), slot);
        }

        if !lag_hours.is_empty() {
            let zones: Vec<String> = features
                .values()
                .flat_map(|m| m.keys().cloned())
                .collect();
            let mut rolling = HashMap::new();
            for zone in zones {
                if rolling.contains_key(&zone) {
                    continue;
                }
                let total: f64 = lag_hours
                    .iter()
                    .map(|&lag| {
                        features
                            .get(&lag_feature_name(lag))
                            .and_then(|m| m.get(&zone))
                            .copied()
                            .unwrap_or(0.0)
                    })
                    .sum();
                rolling.insert(zone, total / lag_hours.len() as f64);
            }
            features.insert(ROLLING_AVG_FEATURE.to_string(), rolling);
        }

        ProxyLags { features }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LagTable {
        let csv = CsvTable::parse(
            Path::new("lags.csv"),
            "pickup_date,pickup_hour,pickup_zone,trip_count\n\
             2023-07-04,13,SoHo,10\n\
             2023-07-04,12,SoHo,20\n\
             2023-07-04,12,Astoria,4\n\
             2023-07-04,23,SoHo,7\n\
             bad-date,1,SoHo,1\n",
        )
        .unwrap();
        LagTable::from_table(&csv).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_lags_use_reference_year() {
        let lags = table().proxy_lags(at(2025, 7, 4, 14), &[1, 2]);
        assert_eq!(lags.value("trip_count_1h_ago", "SoHo"), Some(10.0));
        assert_eq!(lags.value("trip_count_2h_ago", "SoHo"), Some(20.0));
        assert_eq!(lags.value("trip_count_1h_ago", "Astoria"), None);
        assert_eq!(lags.value(ROLLING_AVG_FEATURE, "SoHo"), Some(15.0));
        assert_eq!(lags.value(ROLLING_AVG_FEATURE, "Astoria"), Some(2.0));
    }

    #[test]
    fn test_hour_wraps_within_day() {
        let lags = table().proxy_lags(at(2024, 7, 4, 0), &[1]);
        assert_eq!(lags.value("trip_count_1h_ago", "SoHo"), Some(7.0));
    }

    #[test]
    fn test_leap_day_has_no_lags() {
        let lags = table().proxy_lags(at(2024, 2, 29, 5), &[1, 2]);
        assert!(lags.features.is_empty());
    }
}
