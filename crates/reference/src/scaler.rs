//! Score range and ensemble weights stored next to each month's models

use crate::errors::{ReferenceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Percentile range of raw model output observed during training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreScaler {
    pub min: f64,
    pub max: f64,
}

impl ScoreScaler {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let scaler = Self { min, max };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Both bounds finite and `max > min`.
    pub fn validate(&self) -> Result<()> {
        if self.min.is_finite() && self.max.is_finite() && self.max > self.min {
            Ok(())
        } else {
            Err(ReferenceError::InvalidScaler {
                min: self.min,
                max: self.max,
            })
        }
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReferenceError::io(path, e))?;
        let scaler: Self = serde_json::from_str(&text).map_err(|e| ReferenceError::json(path, e))?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// `scoring_weights_<month>.json`: kept for reporting, not applied to scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoringWeights(BTreeMap<String, serde_json::Value>);

impl ScoringWeights {
    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReferenceError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| ReferenceError::json(path, e))
    }

    /// Numeric weight by name.
    pub fn weight(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(serde_json::Value::as_f64)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
