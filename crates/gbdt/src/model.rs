//! Tree ensemble with deterministic inference
//!
//! The native format is a flat, serde-friendly representation shared by both
//! importers. Trees are always summed in file order so the same input gives
//! bit-identical output across runs and threads.

use crate::objective::Objective;
use crate::tree::Tree;
use crate::{lightgbm, xgboost};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Model errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported model: {0}")]
    Unsupported(String),

    #[error("Invalid model format: {0}")]
    InvalidFormat(String),
}

/// Current native format version
pub const FORMAT_VERSION: u32 = 1;

/// Library that produced the trees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Native,
    Xgboost,
    Lightgbm,
}

/// Gradient-boosted tree ensemble
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ensemble {
    /// Native format version (always 1 for now)
    pub version: u32,

    pub source: ModelSource,

    #[serde(default)]
    pub objective: Objective,

    /// Margin added before the link function
    pub base_margin: f64,

    /// Random-forest style averaging instead of summation
    #[serde(default)]
    pub average_output: bool,

    /// Training-time feature names, empty when the export carried none
    #[serde(default)]
    pub feature_names: Vec<String>,

    pub trees: Vec<Tree>,
}

impl Ensemble {
    /// Create a regression ensemble
    pub fn new(trees: Vec<Tree>, base_margin: f64) -> Self {
        Self {
            version: FORMAT_VERSION,
            source: ModelSource::Native,
            objective: Objective::Regression,
            base_margin,
            average_output: false,
            feature_names: Vec::new(),
            trees,
        }
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != FORMAT_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if !self.base_margin.is_finite() {
            return Err(ModelError::ValidationFailed(format!(
                "Base margin is not finite: {}",
                self.base_margin
            )));
        }

        if self.average_output && self.trees.is_empty() {
            return Err(ModelError::ValidationFailed(
                "Averaging model has no trees".to_string(),
            ));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| {
                ModelError::ValidationFailed(format!("Tree {} validation failed: {}", i, e))
            })?;

            if !self.feature_names.is_empty() {
                if let Some(max) = tree.max_feature_index() {
                    if max >= self.feature_names.len() {
                        return Err(ModelError::ValidationFailed(format!(
                            "Tree {} splits on feature {} but model declares {} features",
                            i,
                            max,
                            self.feature_names.len()
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Raw margin before the link function.
    pub fn predict_margin(&self, features: &[f64]) -> f64 {
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.evaluate(features) * tree.weight;
        }

        if self.average_output && !self.trees.is_empty() {
            sum /= self.trees.len() as f64;
        }

        self.base_margin + sum
    }

    /// Prediction in output space.
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.objective.transform(self.predict_margin(features))
    }

    /// Predict every row in parallel; output order matches input order.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.par_iter().map(|row| self.predict(row)).collect()
    }

    /// Number of features the trees can address.
    pub fn num_features(&self) -> usize {
        if !self.feature_names.is_empty() {
            return self.feature_names.len();
        }
        self.trees
            .iter()
            .filter_map(Tree::max_feature_index)
            .max()
            .map_or(0, |m| m + 1)
    }

    /// Get number of trees in the model
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Compact JSON with object keys sorted at every depth. Two exports of
    /// the same trees serialize to the same bytes.
    pub fn to_canonical_json(&self) -> Result<String, ModelError> {
        let mut value = serde_json::to_value(self)?;
        sort_keys(&mut value);
        Ok(serde_json::to_string(&value)?)
    }

    /// blake3 over the canonical JSON.
    pub fn fingerprint(&self) -> Result<[u8; 32], ModelError> {
        let json = self.to_canonical_json()?;
        Ok(*blake3::hash(json.as_bytes()).as_bytes())
    }

    pub fn hash_hex(&self) -> Result<String, ModelError> {
        Ok(hex::encode(self.fingerprint()?))
    }

    /// Save model to JSON file with canonical serialization
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        let json = self.to_canonical_json()?;
        fs::write(path, json).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load a model file in any supported format
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let model = Self::from_json_str(&json)?;
        debug!(
            path = %path.display(),
            source = ?model.source,
            trees = model.num_trees(),
            "loaded ensemble"
        );
        Ok(model)
    }

    /// Parse native, XGBoost or LightGBM JSON, detected by top-level keys.
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let object = value.as_object().ok_or_else(|| {
            ModelError::InvalidFormat("model JSON must be an object".to_string())
        })?;

        let model = if object.contains_key("learner") {
            xgboost::import(value)?
        } else if object.contains_key("tree_info") {
            lightgbm::import(value)?
        } else if object.contains_key("trees") {
            serde_json::from_value(value)?
        } else {
            return Err(ModelError::InvalidFormat(
                "expected a native, XGBoost or LightGBM model".to_string(),
            ));
        };

        model.validate()?;
        Ok(model)
    }
}

fn sort_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, mut child) in entries {
                sort_keys(&mut child);
                map.insert(key, child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sort_keys),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;

    fn create_test_model() -> Ensemble {
        let tree1 = Tree::new(
            vec![
                Node::internal(0, 0, 50.0, 1, 2),
                Node::leaf(1, 1.0),
                Node::leaf(2, 2.0),
            ],
            1.0,
        );

        let tree2 = Tree::new(
            vec![
                Node::internal(0, 1, 30.0, 1, 2),
                Node::leaf(1, -0.5),
                Node::leaf(2, 0.5),
            ],
            1.0,
        );

        Ensemble::new(vec![tree1, tree2], 0.25)
    }

    #[test]
    fn test_model_creation() {
        let model = create_test_model();
        assert_eq!(model.version, FORMAT_VERSION);
        assert_eq!(model.num_trees(), 2);
        assert_eq!(model.num_features(), 2);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_model_inference() {
        let model = create_test_model();
        // Tree 1 left (1.0), tree 2 left (-0.5), plus base 0.25
        assert_eq!(model.predict(&[30.0, 20.0]), 0.75);
        // Tree 1 right (2.0), tree 2 right (0.5)
        assert_eq!(model.predict(&[60.0, 40.0]), 2.75);
    }

    #[test]
    fn test_average_output() {
        let mut model = create_test_model();
        model.average_output = true;
        assert_eq!(model.predict_margin(&[60.0, 40.0]), 0.25 + 2.5 / 2.0);
    }

    #[test]
    fn test_batch_matches_single_rows() {
        let model = create_test_model();
        let rows = vec![vec![30.0, 20.0], vec![60.0, 40.0], vec![60.0, 10.0]];
        let batch = model.predict_batch(&rows);
        let single: Vec<f64> = rows.iter().map(|r| model.predict(r)).collect();
        assert_eq!(batch, single);
    }

    #[test]
    fn test_hash_deterministic_and_sensitive() {
        let model = create_test_model();
        let hash = model.hash_hex().unwrap();
        assert_eq!(hash, create_test_model().hash_hex().unwrap());
        assert_eq!(hash.len(), 64);

        let mut changed = create_test_model();
        changed.base_margin = 0.0;
        assert_ne!(hash, changed.hash_hex().unwrap());
    }

    #[test]
    fn test_canonical_json_is_compact_and_sorted() {
        let json = create_test_model().to_canonical_json().unwrap();
        assert!(!json.contains(' '));
        assert!(json.starts_with(r#"{"average_output":false,"base_margin":0.25,"#));

        let mut value: Value =
            serde_json::from_str(r#"{"b":1,"a":{"y":[{"q":1,"p":2}],"x":3}}"#).unwrap();
        sort_keys(&mut value);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"a":{"x":3,"y":[{"p":2,"q":1}]},"b":1}"#
        );
    }

    #[test]
    fn test_save_load_json() {
        use tempfile::NamedTempFile;

        let model = create_test_model().with_feature_names(vec!["a".into(), "b".into()]);
        let temp_file = NamedTempFile::new().unwrap();

        model.save_json(temp_file.path()).unwrap();
        let loaded = Ensemble::load_json(temp_file.path()).unwrap();

        assert_eq!(model, loaded);
        assert_eq!(model.hash_hex().unwrap(), loaded.hash_hex().unwrap());
    }

    #[test]
    fn test_model_validation() {
        let mut invalid = create_test_model();
        invalid.version = 999;
        assert!(invalid.validate().is_err());

        let narrow = create_test_model().with_feature_names(vec!["only_one".into()]);
        assert!(narrow.validate().is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(matches!(
            Ensemble::from_json_str(r#"{"booster": []}"#),
            Err(ModelError::InvalidFormat(_))
        ));
        assert!(Ensemble::from_json_str("[1, 2]").is_err());
    }
}
