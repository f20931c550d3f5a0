//! Training-time column lists (`expected_columns_*.json`, `model_features.json`)

use crate::errors::{ReferenceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Ordered, duplicate-free list of feature names a model was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ExpectedColumns {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl ExpectedColumns {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ReferenceError::InvalidSchema(
                "column list is empty".to_string(),
            ));
        }
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(ReferenceError::InvalidSchema(format!(
                    "duplicate column '{name}'"
                )));
            }
        }
        Ok(Self { columns, index })
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReferenceError::io(path, e))?;
        let columns: Vec<String> =
            serde_json::from_str(&text).map_err(|e| ReferenceError::json(path, e))?;
        Self::new(columns).map_err(|e| match e {
            ReferenceError::InvalidSchema(msg) => {
                ReferenceError::InvalidSchema(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl TryFrom<Vec<String>> for ExpectedColumns {
    type Error = ReferenceError;

    fn try_from(columns: Vec<String>) -> Result<Self> {
        Self::new(columns)
    }
}

impl From<ExpectedColumns> for Vec<String> {
    fn from(schema: ExpectedColumns) -> Self {
        schema.columns
    }
}
