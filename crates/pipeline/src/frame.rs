//! Named feature rows prior to column alignment

use serde::Serialize;
use std::collections::BTreeMap;

/// A single cell: numeric, or a raw category awaiting encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(v) => Some(*v),
            FeatureValue::Category(_) => None,
        }
    }

    /// Text used to look the value up in a category map. Integral numbers
    /// render without a fractional part.
    pub fn as_key(&self) -> String {
        match self {
            FeatureValue::Category(s) => s.clone(),
            FeatureValue::Number(v) if v.is_finite() && v.fract() == 0.0 => {
                format!("{}", *v as i64)
            }
            FeatureValue::Number(v) => v.to_string(),
        }
    }
}

/// Feature name → value for one observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureRow {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_number(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), FeatureValue::Number(value));
    }

    pub fn set_category(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into(), FeatureValue::Category(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FeatureValue::as_number)
    }

    pub fn category(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FeatureValue::Category(s) => Some(s),
            FeatureValue::Number(_) => None,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<FeatureValue> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
