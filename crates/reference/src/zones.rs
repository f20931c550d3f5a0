//! Taxi zone directory (`zone_coordinates.csv`)

use crate::errors::Result;
use crate::table::{field, parse_float, parse_id, CsvTable};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, instrument};

/// One row of the zone directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRecord {
    pub zone: String,
    pub borough: Option<String>,
    pub object_id: Option<i64>,
    pub location_id: Option<i64>,
    pub centroid: Option<(f64, f64)>,
    pub geometry: Option<String>,
}

/// All zones in file order, plus name lookups where later rows win.
#[derive(Debug, Clone, Default)]
pub struct ZoneDirectory {
    records: Vec<ZoneRecord>,
    by_name: HashMap<String, usize>,
}

impl ZoneDirectory {
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self> {
        let table = CsvTable::load(path)?;
        let directory = Self::from_table(&table)?;
        debug!(zones = directory.len(), "loaded zone directory");
        Ok(directory)
    }

    pub fn from_table(table: &CsvTable) -> Result<Self> {
        let zone = table.require("zone")?;
        let borough = table.column("borough");
        let object_id = table.column("OBJECTID");
        let location_id = table.column("LocationID");
        let lat = table.column("centroid_lat");
        let lon = table.column("centroid_lon");
        let geometry = table.column("geometry");

        let optional = |record: &csv::StringRecord, idx: Option<usize>| {
            idx.map(|i| field(record, i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let records = table
            .records()
            .iter()
            .map(|record| {
                let centroid = match (lat, lon) {
                    (Some(la), Some(lo)) => parse_float(field(record, la))
                        .zip(parse_float(field(record, lo)))
                        .filter(|(a, b)| a.is_finite() && b.is_finite()),
                    _ => None,
                };
                ZoneRecord {
                    zone: field(record, zone).to_string(),
                    borough: optional(record, borough),
                    object_id: object_id.and_then(|i| parse_id(field(record, i))),
                    location_id: location_id.and_then(|i| parse_id(field(record, i))),
                    centroid,
                    geometry: optional(record, geometry),
                }
            })
            .collect();

        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<ZoneRecord>) -> Self {
        let by_name = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.zone.clone(), i))
            .collect();
        Self { records, by_name }
    }

    /// Rows in file order, duplicates included.
    pub fn records(&self) -> &[ZoneRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, zone: &str) -> Option<&ZoneRecord> {
        self.by_name.get(zone).map(|&i| &self.records[i])
    }

    pub fn borough_of(&self, zone: &str) -> Option<&str> {
        self.get(zone).and_then(|r| r.borough.as_deref())
    }

    /// Zone identifier (OBJECTID) by name.
    pub fn id_of(&self, zone: &str) -> Option<i64> {
        self.get(zone).and_then(|r| r.object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(csv: &str) -> ZoneDirectory {
        let table = CsvTable::parse(Path::new("zones.csv"), csv).unwrap();
        ZoneDirectory::from_table(&table).unwrap()
    }

    #[test]
    fn test_last_row_wins_for_lookups() {
        let dir = directory(
            "OBJECTID,zone,borough,LocationID\n\
             56,Corona,Queens,56\n\
             57,Corona,Queens,57\n\
             132,JFK Airport,Queens,132\n",
        );
        assert_eq!(dir.len(), 3);
        assert_eq!(dir.id_of("Corona"), Some(57));
        assert_eq!(dir.borough_of("JFK Airport"), Some("Queens"));
        assert_eq!(dir.borough_of("Atlantis"), None);
        assert_eq!(dir.records()[0].object_id, Some(56));
    }

    #[test]
    fn test_optional_columns() {
        let dir = directory("zone,centroid_lat,centroid_lon\nMidtown Center,40.75,-73.98\nNowhere,,\n");
        assert_eq!(dir.records()[0].centroid, Some((40.75, -73.98)));
        assert_eq!(dir.records()[1].centroid, None);
        assert_eq!(dir.borough_of("Midtown Center"), None);
        assert_eq!(dir.id_of("Midtown Center"), None);
    }

    #[test]
    fn test_zone_column_required() {
        let table = CsvTable::parse(Path::new("zones.csv"), "name\nA\n").unwrap();
        assert!(ZoneDirectory::from_table(&table).is_err());
    }
}
