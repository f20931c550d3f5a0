//! Locating per-month resource folders on disk

use crate::errors::{ReferenceError, Result};
use crate::month::Month;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which trip-scoring model a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Xgb,
    Lgb,
}

impl ModelKind {
    /// File-name suffix, `"xgb"` or `"lgb"`.
    pub fn suffix(self) -> &'static str {
        match self {
            ModelKind::Xgb => "xgb",
            ModelKind::Lgb => "lgb",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// File names inside a month folder such as `models/july/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthFiles {
    pub month: Month,
    pub dir: PathBuf,
}

impl MonthFiles {
    pub fn model(&self, kind: ModelKind) -> PathBuf {
        self.dir
            .join(format!("model_{}_{}.json", self.month.full_name(), kind.suffix()))
    }

    pub fn weights(&self) -> PathBuf {
        self.dir
            .join(format!("scoring_weights_{}.json", self.month.full_name()))
    }

    pub fn scaler(&self) -> PathBuf {
        self.dir.join(format!("scaler_{}.json", self.month.full_name()))
    }

    pub fn hotness(&self) -> PathBuf {
        self.dir
            .join(format!("hotness_table_{}.csv", self.month.full_name()))
    }

    pub fn duration(&self) -> PathBuf {
        self.dir
            .join(format!("duration_variability_{}.csv", self.month.full_name()))
    }
}

pub fn expected_columns_file(dir: &Path, kind: ModelKind) -> PathBuf {
    dir.join(format!("expected_columns_{}.json", kind.suffix()))
}

/// Find the folder holding `month`'s models.
///
/// For each root, tries `models/<month>`, `Models/<month>` and `<month>`,
/// accepting the first that contains the XGBoost model file.
pub fn locate_month_dir(roots: &[PathBuf], month: Month) -> Result<MonthFiles> {
    let name = month.full_name();
    let mut searched = Vec::new();

    for root in roots {
        for candidate in [
            root.join("models").join(name),
            root.join("Models").join(name),
            root.join(name),
        ] {
            let files = MonthFiles {
                month,
                dir: candidate,
            };
            let marker = files.model(ModelKind::Xgb);
            if marker.is_file() {
                debug!(dir = %files.dir.display(), "found month resources");
                return Ok(files);
            }
            searched.push(marker);
        }
    }

    Err(ReferenceError::NotFound {
        what: format!("models directory for month {name}"),
        searched,
    })
}

/// Find the folder holding `expected_columns_{xgb,lgb}.json`.
///
/// Tries `<root>/models/expected_columns`, then a sibling of the month
/// folder, then `<root>/expected_columns`.
pub fn locate_expected_columns(roots: &[PathBuf], month_dir: &Path) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    for root in roots {
        candidates.push(root.join("models").join("expected_columns"));
        if let Some(parent) = month_dir.parent() {
            candidates.push(parent.join("expected_columns"));
        }
        candidates.push(root.join("expected_columns"));
    }

    let mut searched = Vec::new();
    for dir in candidates {
        let marker = expected_columns_file(&dir, ModelKind::Xgb);
        if marker.is_file() {
            debug!(dir = %dir.display(), "found expected columns");
            return Ok(dir);
        }
        if !searched.contains(&marker) {
            searched.push(marker);
        }
    }

    Err(ReferenceError::NotFound {
        what: "expected_columns directory".to_string(),
        searched,
    })
}

/// `hotspot_model_<m-1>_to_<m>.json`; January has no predecessor model.
pub fn hotspot_model_file(month: Month) -> Option<String> {
    month
        .previous()
        .map(|prev| format!("hotspot_model_{}_to_{}.json", prev.number(), month.number()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
    }

    #[test]
    fn test_month_dir_search_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("july/model_july_xgb.json"));
        touch(&root.join("Models/july/model_july_xgb.json"));

        let files = locate_month_dir(&[root.clone()], Month::July).unwrap();
        assert_eq!(files.dir, root.join("Models/july"));
        assert_eq!(files.scaler(), root.join("Models/july/scaler_july.json"));
        assert_eq!(
            files.model(ModelKind::Lgb),
            root.join("Models/july/model_july_lgb.json")
        );
    }

    #[test]
    fn test_missing_month_lists_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate_month_dir(&[dir.path().to_path_buf()], Month::March).unwrap_err();
        match err {
            ReferenceError::NotFound { searched, .. } => assert_eq!(searched.len(), 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_expected_columns_next_to_month_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let month_dir = root.join("bundle/july");
        touch(&root.join("bundle/expected_columns/expected_columns_xgb.json"));

        let found = locate_expected_columns(&[root.clone()], &month_dir).unwrap();
        assert_eq!(found, root.join("bundle/expected_columns"));

        touch(&root.join("models/expected_columns/expected_columns_xgb.json"));
        let found = locate_expected_columns(&[root.clone()], &month_dir).unwrap();
        assert_eq!(found, root.join("models/expected_columns"));
    }

    #[test]
    fn test_hotspot_model_names() {
        assert_eq!(hotspot_model_file(Month::January), None);
        assert_eq!(
            hotspot_model_file(Month::February).as_deref(),
            Some("hotspot_model_1_to_2.json")
        );
        assert_eq!(
            hotspot_model_file(Month::December).as_deref(),
            Some("hotspot_model_11_to_12.json")
        );
    }
}
