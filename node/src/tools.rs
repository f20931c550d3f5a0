//! Offline commands: zone preprocessing and model conversion.

use anyhow::{Context, Result};
use std::path::Path;
use taxiscore_gbdt::Ensemble;
use taxiscore_reference::geometry::{preprocess_zones, write_processed, SAMPLE_LOCATIONS};
use taxiscore_reference::ZoneLocator;
use tracing::{info, warn};

/// Project the zone export to WGS84 JSON and report where the sample
/// locations land.
pub fn run_preprocess_zones(
    input: &Path,
    output: &Path,
) -> Result<Vec<(String, Option<String>)>> {
    let outcome = preprocess_zones(input)
        .with_context(|| format!("failed to preprocess {}", input.display()))?;
    for (zone, reason) in &outcome.skipped {
        warn!(%zone, %reason, "skipped zone");
    }

    write_processed(output, &outcome.zones)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        zones = outcome.zones.len(),
        skipped = outcome.skipped.len(),
        output = %output.display(),
        "wrote processed zones"
    );

    let locator = ZoneLocator::new(outcome.zones);
    let samples = SAMPLE_LOCATIONS
        .iter()
        .map(|&(name, lat, lon)| {
            let zone = locator.locate(lat, lon).map(|z| z.name.clone());
            (name.to_string(), zone)
        })
        .collect();
    Ok(samples)
}

/// Import an XGBoost or LightGBM export and store it in the native format.
/// Returns the model hash.
pub fn run_convert_model(input: &Path, output: &Path) -> Result<String> {
    let model = Ensemble::load_json(input)
        .with_context(|| format!("failed to load model {}", input.display()))?;
    model
        .validate()
        .with_context(|| format!("model {} failed validation", input.display()))?;
    model
        .save_json(output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let hash = model.hash_hex()?;
    info!(
        source = ?model.source,
        trees = model.num_trees(),
        %hash,
        "converted model"
    );
    Ok(hash)
}

pub fn run_model_hash(path: &Path) -> Result<String> {
    let model = Ensemble::load_json(path)
        .with_context(|| format!("failed to load model {}", path.display()))?;
    Ok(model.hash_hex()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGHTGBM_DUMP: &str = r#"{
        "objective": "regression",
        "feature_names": ["a", "b"],
        "tree_info": [{"tree_structure": {
            "split_feature": 1,
            "threshold": 2.5,
            "decision_type": "<=",
            "default_left": false,
            "missing_type": "NaN",
            "left_child": {"leaf_value": -1.0},
            "right_child": {"leaf_value": 3.0}
        }}]
    }"#;

    #[test]
    fn test_convert_then_hash() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("dump.json");
        let output = dir.path().join("native.json");
        std::fs::write(&input, LIGHTGBM_DUMP).unwrap();

        let hash = run_convert_model(&input, &output).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(run_model_hash(&output).unwrap(), hash);
        assert_eq!(run_model_hash(&input).unwrap(), hash);

        let native = Ensemble::load_json(&output).unwrap();
        assert_eq!(native.predict(&[0.0, 3.0]), 3.0);
        assert_eq!(native.predict(&[0.0, f64::NAN]), 3.0);
    }

    #[test]
    fn test_convert_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_convert_model(&dir.path().join("nope.json"), &dir.path().join("out.json"))
            .unwrap_err();
        assert!(err.to_string().contains("failed to load model"));
    }

    #[test]
    fn test_preprocess_reports_samples() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("taxi_zones.csv");
        let output = dir.path().join("processed.json");
        // Square of roughly 2 km around Times Square, in EPSG:2263 feet.
        std::fs::write(
            &input,
            "LocationID,zone,borough,centroid_lat,centroid_lon,geometry\n\
             230,Times Sq/Theatre District,Manhattan,40.759,-73.984,\
             \"POLYGON ((985000 212000, 991000 212000, 991000 218000, 985000 218000, 985000 212000))\"\n\
             999,Nowhere,Unknown,,,\"POLYGON ((0 0, 1 0, 1 1, 0 0))\"\n",
        )
        .unwrap();

        let samples = run_preprocess_zones(&input, &output).unwrap();
        assert_eq!(ZoneLocator::load_json(&output).unwrap().len(), 1);
        assert_eq!(samples.len(), SAMPLE_LOCATIONS.len());
        let found: Vec<_> = samples
            .iter()
            .filter_map(|(name, zone)| zone.as_ref().map(|z| (name.as_str(), z.as_str())))
            .collect();
        assert_eq!(found, vec![("Times Square", "Times Sq/Theatre District")]);
    }
}
