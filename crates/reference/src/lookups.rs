//! Per-month lookup tables joined into trip features
//!
//! Both tables behave like a left join that keeps the first matching row:
//! a key present more than once resolves to its first occurrence, and an
//! empty or NaN value reads as absent.

use crate::errors::Result;
use crate::table::{field, parse_float, parse_key, CsvTable};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, instrument};

fn non_nan(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// `hotness_table_<month>.csv`: historical demand at the dropoff zone.
#[derive(Debug, Clone, Default)]
pub struct HotnessTable {
    entries: HashMap<(String, u32, u32), Option<f64>>,
}

impl HotnessTable {
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self> {
        let table = CsvTable::load(path)?;
        let hotness = Self::from_table(&table)?;
        debug!(entries = hotness.len(), "loaded hotness table");
        Ok(hotness)
    }

    pub fn from_table(table: &CsvTable) -> Result<Self> {
        let zone = table.require("dropoff_zone")?;
        let day = table.require("pickup_day_of_week")?;
        let hour = table.require("pickup_hour")?;
        let value = table.require("dropoff_zone_hotness")?;

        let mut entries = HashMap::new();
        for record in table.records() {
            let (Some(d), Some(h)) = (parse_key(field(record, day)), parse_key(field(record, hour)))
            else {
                continue;
            };
            entries
                .entry((field(record, zone).to_string(), d, h))
                .or_insert_with(|| non_nan(parse_float(field(record, value))));
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, dropoff_zone: &str, day_of_week: u32, hour: u32, value: f64) {
        self.entries
            .entry((dropoff_zone.to_string(), day_of_week, hour))
            .or_insert(non_nan(Some(value)));
    }

    pub fn lookup(&self, dropoff_zone: &str, day_of_week: u32, hour: u32) -> Option<f64> {
        self.entries
            .get(&(dropoff_zone.to_string(), day_of_week, hour))
            .copied()
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type DurationKey = (String, String, u32, u32);

/// `duration_variability_<month>.csv`: spread of trip durations per route.
#[derive(Debug, Clone, Default)]
pub struct DurationTable {
    entries: HashMap<DurationKey, Option<f64>>,
}

impl DurationTable {
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self> {
        let table = CsvTable::load(path)?;
        let duration = Self::from_table(&table)?;
        debug!(entries = duration.len(), "loaded duration variability table");
        Ok(duration)
    }

    pub fn from_table(table: &CsvTable) -> Result<Self> {
        let pickup = table.require("pickup_zone")?;
        let dropoff = table.require("dropoff_zone")?;
        let day = table.require("pickup_day_of_week")?;
        let hour = table.require("pickup_hour")?;
        let value = table.require("trip_duration_variability")?;

        let mut entries = HashMap::new();
        for record in table.records() {
            let (Some(d), Some(h)) = (parse_key(field(record, day)), parse_key(field(record, hour)))
            else {
                continue;
            };
            let key = (
                field(record, pickup).to_string(),
                field(record, dropoff).to_string(),
                d,
                h,
            );
            entries
                .entry(key)
                .or_insert_with(|| non_nan(parse_float(field(record, value))));
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, pickup_zone: &str, dropoff_zone: &str, day: u32, hour: u32, value: f64) {
        self.entries
            .entry((pickup_zone.to_string(), dropoff_zone.to_string(), day, hour))
            .or_insert(non_nan(Some(value)));
    }

    pub fn lookup(&self, pickup_zone: &str, dropoff_zone: &str, day: u32, hour: u32) -> Option<f64> {
        self.entries
            .get(&(pickup_zone.to_string(), dropoff_zone.to_string(), day, hour))
            .copied()
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str) -> CsvTable {
        CsvTable::parse(Path::new("t.csv"), csv).unwrap()
    }

    #[test]
    fn test_hotness_first_match_wins() {
        let table = HotnessTable::from_table(&parse(
            "dropoff_zone,pickup_day_of_week,pickup_hour,dropoff_zone_hotness\n\
             Midtown Center,2,14,0.8\n\
             Midtown Center,2,14,0.1\n\
             Midtown Center,3,14,\n\
             Midtown Center,4,14.0,nan\n",
        ))
        .unwrap();

        assert_eq!(table.lookup("Midtown Center", 2, 14), Some(0.8));
        assert_eq!(table.lookup("Midtown Center", 3, 14), None);
        assert_eq!(table.lookup("Midtown Center", 4, 14), None);
        assert_eq!(table.lookup("Midtown Center", 5, 14), None);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_hotness_header_whitespace() {
        let table = HotnessTable::from_table(&parse(
            " dropoff_zone , pickup_day_of_week , pickup_hour , dropoff_zone_hotness \n\
             SoHo,0,0,1.25\n",
        ))
        .unwrap();
        assert_eq!(table.lookup("SoHo", 0, 0), Some(1.25));
    }

    #[test]
    fn test_duration_lookup() {
        let table = DurationTable::from_table(&parse(
            "pickup_zone,dropoff_zone,pickup_day_of_week,pickup_hour,trip_duration_variability\n\
             JFK Airport,Midtown Center,6,23,12.5\n\
             JFK Airport,Midtown Center,6,23,99\n",
        ))
        .unwrap();
        assert_eq!(table.lookup("JFK Airport", "Midtown Center", 6, 23), Some(12.5));
        assert_eq!(table.lookup("Midtown Center", "JFK Airport", 6, 23), None);
    }

    #[test]
    fn test_duration_requires_columns() {
        assert!(DurationTable::from_table(&parse("pickup_zone,dropoff_zone\nA,B\n")).is_err());
    }
}
