//! Error types for the scoring pipeline

use taxiscore_gbdt::ModelError;
use taxiscore_reference::ReferenceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Trip timestamp does not match `MM/DD/YYYY HH:MM:SS AM/PM`
    #[error("Invalid datetime format. Expected: MM/DD/YYYY HH:MM:SS AM/PM (got '{0}')")]
    InvalidDatetime(String),

    /// Hotspot time does not match `YYYY-MM-DDTHH:MM:SSZ`
    #[error("Invalid time format. Use ISO format: YYYY-MM-DDTHH:MM:SSZ (got '{0}')")]
    InvalidTime(String),

    /// No hotspot model exists for the month
    #[error("{0} predictions not supported.")]
    UnsupportedMonth(String),

    /// Model produced no usable score
    #[error("Could not score trip: {0}")]
    ScoringFailed(String),

    /// A feature the schema needs is not numeric
    #[error("Feature '{0}' is not numeric")]
    NonNumericFeature(String),

    /// A column named by an encoding map is absent from the rows
    #[error("Missing feature column '{0}'")]
    MissingFeature(String),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
