//! Projection of named feature rows onto a model's column order

use crate::errors::{PipelineError, Result};
use crate::frame::{FeatureRow, FeatureValue};
use taxiscore_reference::ExpectedColumns;

/// Absent columns are filled with `0.0`; columns not in the schema are dropped.
#[derive(Debug, Clone, Copy)]
pub struct ColumnAligner<'a> {
    schema: &'a ExpectedColumns,
}

impl<'a> ColumnAligner<'a> {
    pub fn new(schema: &'a ExpectedColumns) -> Self {
        Self { schema }
    }

    pub fn align(&self, row: &FeatureRow) -> Result<Vec<f64>> {
        self.schema
            .names()
            .iter()
            .map(|name| match row.get(name) {
                None => Ok(0.0),
                Some(FeatureValue::Number(v)) => Ok(*v),
                Some(FeatureValue::Category(_)) => Err(PipelineError::NonNumericFeature(name.clone())),
            })
            .collect()
    }

    pub fn align_all(&self, rows: &[FeatureRow]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.align(r)).collect()
    }

    pub fn width(&self) -> usize {
        self.schema.len()
    }
}
