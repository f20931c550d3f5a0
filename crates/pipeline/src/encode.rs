//! Categorical encodings applied before alignment

use crate::errors::{PipelineError, Result};
use crate::frame::{FeatureRow, FeatureValue};
use std::collections::BTreeSet;
use taxiscore_reference::{encoded_column, TargetEncoder};

/// Dummy-encode categorical columns over a batch, dropping the first
/// category of each column in sorted order.
///
/// Each column is replaced by `<column>_<category>` indicators for the
/// categories the batch actually contains, minus the first. A column with a
/// single distinct value yields no indicators, so a one-row batch keeps none
/// and alignment fills zeros.
pub fn dummies_drop_first(rows: &mut [FeatureRow], columns: &[&str]) -> Result<()> {
    for column in columns {
        let keys = rows
            .iter()
            .map(|row| {
                row.get(column)
                    .map(FeatureValue::as_key)
                    .ok_or_else(|| PipelineError::MissingFeature(column.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let categories: BTreeSet<&str> = keys.iter().map(String::as_str).collect();

        for (row, key) in rows.iter_mut().zip(&keys) {
            row.remove(column);
            for category in categories.iter().skip(1) {
                let hit = *category == key.as_str();
                row.set_number(format!("{column}_{category}"), if hit { 1.0 } else { 0.0 });
            }
        }
    }
    Ok(())
}

/// Add `<column>_target_encoded` for every column the encoder knows, then
/// drop the raw categorical columns.
pub fn apply_target_encoding(
    rows: &mut [FeatureRow],
    encoder: &TargetEncoder,
    raw_columns: &[&str],
) -> Result<()> {
    for (column, encoding) in encoder.columns() {
        let target = encoded_column(column);
        for row in rows.iter_mut() {
            let key = row
                .get(column)
                .map(|v| v.as_key())
                .ok_or_else(|| PipelineError::MissingFeature(column.to_string()))?;
            row.set_number(target.clone(), encoding.encode(&key));
        }
    }

    for row in rows.iter_mut() {
        for column in raw_columns {
            row.remove(column);
        }
    }
    Ok(())
}
