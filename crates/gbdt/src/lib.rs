//! Gradient-boosted tree ensembles for taxiscore
//!
//! Models are trained offline with XGBoost or LightGBM and exported as JSON.
//! This crate reads either export, normalizes it into one flat
//! [`Ensemble`] representation and evaluates it deterministically.
//!
//! Modules:
//! - `tree`: flat decision trees and their split/missing-value rules
//! - `model`: the ensemble, format detection, canonical save/load
//! - `objective`: link functions applied to the raw margin
//! - `xgboost` / `lightgbm`: importers for the two export formats
//!
//! # Usage
//!
//! ```rust
//! use taxiscore_gbdt::{Ensemble, Node, Tree};
//!
//! let tree = Tree::new(
//!     vec![
//!         Node::internal(0, 0, 0.5, 1, 2),
//!         Node::leaf(1, -1.0),
//!         Node::leaf(2, 1.0),
//!     ],
//!     1.0,
//! );
//! let model = Ensemble::new(vec![tree], 0.5);
//! assert_eq!(model.predict(&[0.9]), 1.5);
//! ```

pub mod lightgbm;
pub mod model;
pub mod objective;
pub mod tree;
pub mod xgboost;

pub use model::{Ensemble, ModelError, ModelSource, FORMAT_VERSION};
pub use objective::Objective;
pub use tree::{MissingRule, Node, SplitRule, Tree};

/// Crate version string for model metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
