//! Error types for reference data loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or querying reference data
#[derive(Error, Debug)]
pub enum ReferenceError {
    /// File could not be read
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV could not be parsed
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// JSON could not be parsed
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required column is absent from a table
    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    /// A value could not be interpreted
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Unknown month name or number
    #[error("Invalid month: {0}")]
    InvalidMonth(String),

    /// Scaler bounds are unusable for normalization
    #[error("Invalid scaler: min={min}, max={max}")]
    InvalidScaler { min: f64, max: f64 },

    /// Expected-columns list is malformed
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// WKT text could not be parsed
    #[error("WKT parse error: {0}")]
    Wkt(String),

    /// No candidate location held the requested resource
    #[error("Could not find {what}; searched: {}", display_paths(.searched))]
    NotFound { what: String, searched: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ReferenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Result type for reference data operations
pub type Result<T> = std::result::Result<T, ReferenceError>;
