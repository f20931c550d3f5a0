//! Point-of-interest densities per zone (`zone_stats_with_all_densities.csv`)

use crate::errors::Result;
use crate::table::{field, parse_float, CsvTable};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, instrument};

/// Numeric POI columns keyed by zone name.
///
/// A column counts as numeric when every non-empty cell parses as a number.
/// Duplicate zones keep their first row.
#[derive(Debug, Clone, Default)]
pub struct PoiTable {
    columns: Vec<String>,
    rows: HashMap<String, Vec<f64>>,
}

impl PoiTable {
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self> {
        let table = CsvTable::load(path)?;
        let poi = Self::from_table(&table)?;
        debug!(
            zones = poi.rows.len(),
            columns = poi.columns.len(),
            "loaded POI densities"
        );
        Ok(poi)
    }

    pub fn from_table(table: &CsvTable) -> Result<Self> {
        let zone = table.require("zone")?;

        let numeric: Vec<usize> = (0..table.headers().len())
            .filter(|&i| i != zone)
            .filter(|&i| {
                table.records().iter().all(|r| {
                    let v = field(r, i);
                    v.is_empty() || parse_float(v).is_some()
                })
            })
            .collect();

        let columns = numeric
            .iter()
            .map(|&i| table.headers()[i].clone())
            .collect();

        let mut rows = HashMap::new();
        for record in table.records() {
            rows.entry(field(record, zone).to_string()).or_insert_with(|| {
                numeric
                    .iter()
                    .map(|&i| parse_float(field(record, i)).unwrap_or(f64::NAN))
                    .collect()
            });
        }

        Ok(Self { columns, rows })
    }

    /// Numeric column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, zone: &str) -> bool {
        self.rows.contains_key(zone)
    }

    /// `(column, density)` pairs for a zone, in column order.
    pub fn densities<'a>(&'a self, zone: &str) -> Option<impl Iterator<Item = (&'a str, f64)> + 'a> {
        let values = self.rows.get(zone)?;
        Some(
            self.columns
                .iter()
                .map(String::as_str)
                .zip(values.iter().copied()),
        )
    }

    pub fn value(&self, zone: &str, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(zone).map(|row| row[idx])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
