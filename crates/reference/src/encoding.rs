//! Target-encoding maps (`<column>_target_encoding.json`)

use crate::errors::{ReferenceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, instrument};

const FILE_SUFFIX: &str = "_target_encoding.json";

/// Suffix appended to a categorical column's name once encoded.
pub const ENCODED_SUFFIX: &str = "_target_encoded";

/// Category → target mean for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnEncoding {
    mapping: HashMap<String, f64>,
    fallback: f64,
}

impl ColumnEncoding {
    /// Unseen categories map to the mean of all known values (0 when empty).
    pub fn new(mapping: HashMap<String, f64>) -> Self {
        let fallback = if mapping.is_empty() {
            0.0
        } else {
            mapping.values().sum::<f64>() / mapping.len() as f64
        };
        Self { mapping, fallback }
    }

    pub fn encode(&self, category: &str) -> f64 {
        self.mapping.get(category).copied().unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> f64 {
        self.fallback
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

/// Encodings for every column that has a map on disk, sorted by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetEncoder {
    columns: BTreeMap<String, ColumnEncoding>,
}

impl TargetEncoder {
    /// Load every `<column>_target_encoding.json` in `dir`.
    ///
    /// Each file holds a JSON object of category → number.
    #[instrument(level = "debug")]
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| ReferenceError::io(dir, e))?;
        let mut encoder = Self::default();

        for entry in entries {
            let entry = entry.map_err(|e| ReferenceError::io(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(column) = name.strip_suffix(FILE_SUFFIX) else {
                continue;
            };
            let path = entry.path();
            let text = std::fs::read_to_string(&path).map_err(|e| ReferenceError::io(&path, e))?;
            let mapping = parse_mapping(&text).map_err(|e| ReferenceError::json(&path, e))?;
            encoder.insert(column, ColumnEncoding::new(mapping));
        }

        debug!(columns = encoder.columns.len(), "loaded target encodings");
        Ok(encoder)
    }

    pub fn insert(&mut self, column: &str, encoding: ColumnEncoding) {
        self.columns.insert(column.to_string(), encoding);
    }

    pub fn get(&self, column: &str) -> Option<&ColumnEncoding> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnEncoding)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Keys may have been numbers in the training frame; JSON forces them to
/// strings, so they are matched textually. Non-numeric values are rejected.
fn parse_mapping(text: &str) -> std::result::Result<HashMap<String, f64>, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn encoded_column(column: &str) -> String {
    format!("{column}{ENCODED_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_category_uses_mean() {
        let enc = ColumnEncoding::new(HashMap::from([
            ("SoHo".to_string(), 10.0),
            ("Astoria".to_string(), 2.0),
        ]));
        assert_eq!(enc.encode("SoHo"), 10.0);
        assert_eq!(enc.encode("Atlantis"), 6.0);
        assert_eq!(ColumnEncoding::new(HashMap::new()).encode("x"), 0.0);
    }

    #[test]
    fn test_load_dir_picks_only_encoding_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pickup_zone_target_encoding.json"),
            r#"{"SoHo": 3.5, "Astoria": 1.5}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("day_time_interaction_target_encoding.json"),
            r#"{"0_Midday": 4.0}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("README.txt"), "not a map").unwrap();

        let encoder = TargetEncoder::load_dir(dir.path()).unwrap();
        assert_eq!(encoder.len(), 2);
        let names: Vec<_> = encoder.columns().map(|(c, _)| c).collect();
        assert_eq!(names, vec!["day_time_interaction", "pickup_zone"]);
        assert_eq!(encoder.get("pickup_zone").unwrap().fallback(), 2.5);
    }

    #[test]
    fn test_malformed_map_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pickup_zone_target_encoding.json"),
            r#"{"SoHo": "high"}"#,
        )
        .unwrap();
        assert!(matches!(
            TargetEncoder::load_dir(dir.path()),
            Err(ReferenceError::Json { .. })
        ));
    }

    #[test]
    fn test_encoded_column_name() {
        assert_eq!(encoded_column("pickup_zone"), "pickup_zone_target_encoded");
    }
}
