//! CSV loading shared by the reference tables

use crate::errors::{ReferenceError, Result};
use std::path::{Path, PathBuf};

/// Read a text file as UTF-8, falling back to ISO-8859-1.
///
/// The zone exports carry a few Latin-1 encoded names.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| ReferenceError::io(path, e))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            tracing::debug!(path = %path.display(), "file is not UTF-8, decoding as ISO-8859-1");
            Ok(err.into_bytes().iter().map(|&b| char::from(b)).collect())
        }
    }
}

/// Fully loaded CSV file with trimmed header names.
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
}

impl CsvTable {
    pub fn load(path: &Path) -> Result<Self> {
        let text = read_text(path)?;
        Self::parse(path, &text)
    }

    /// Parse CSV text; `path` is only used in error messages.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| ReferenceError::csv(path, e))?
            .iter()
            .map(str::to_string)
            .collect();

        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ReferenceError::csv(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[csv::StringRecord] {
        &self.records
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| ReferenceError::MissingColumn {
            path: self.path.clone(),
            column: name.to_string(),
        })
    }
}

/// Field at `idx`, trimmed; empty when the record is short.
pub fn field(record: &csv::StringRecord, idx: usize) -> &str {
    record.get(idx).map(str::trim).unwrap_or("")
}

/// Parse a numeric cell. Empty cells are `None`; `nan` parses to NaN.
pub fn parse_float(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse().ok()
}

/// Parse an integral key such as an hour, accepting `"7"` and `"7.0"`.
pub fn parse_key(value: &str) -> Option<u32> {
    let v = parse_float(value)?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

/// Parse an integral identifier, accepting `"12"` and `"12.0"`.
pub fn parse_id(value: &str) -> Option<i64> {
    let v = parse_float(value)?;
    if v.is_finite() && v.fract() == 0.0 {
        Some(v as i64)
    } else {
        None
    }
}
