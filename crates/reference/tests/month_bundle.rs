//! Loads a complete month folder the way the scoring service does.

use std::fs;
use std::path::Path;
use taxiscore_reference::discovery::expected_columns_file;
use taxiscore_reference::{
    locate_expected_columns, locate_month_dir, DurationTable, ExpectedColumns, HotnessTable,
    ModelKind, Month, ScoreScaler, ScoringWeights,
};

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn month_bundle_loads_from_discovered_paths() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    let month = root.join("models/july");

    write(&month.join("model_july_xgb.json"), "{}");
    write(&month.join("scaler_july.json"), r#"{"min": -2.0, "max": 8.0}"#);
    write(&month.join("scoring_weights_july.json"), r#"{"xgb": 0.7, "lgb": 0.3}"#);
    write(
        &month.join("hotness_table_july.csv"),
        "dropoff_zone ,pickup_day_of_week,pickup_hour, dropoff_zone_hotness\n\
         Midtown Center,0,8,0.92\n",
    );
    write(
        &month.join("duration_variability_july.csv"),
        "pickup_zone,dropoff_zone,pickup_day_of_week,pickup_hour,trip_duration_variability\n\
         JFK Airport,Midtown Center,0,8,14.2\n",
    );
    write(
        &root.join("models/expected_columns/expected_columns_xgb.json"),
        r#"["dropoff_zone_hotness","trip_duration_variability","sin_hour","cos_hour","is_weekend"]"#,
    );

    let files = locate_month_dir(&[root.clone()], Month::from_abbr("jul").unwrap()).unwrap();
    assert_eq!(files.dir, month);

    let scaler = ScoreScaler::load_json(&files.scaler()).unwrap();
    assert_eq!(scaler.range(), 10.0);

    let weights = ScoringWeights::load_json(&files.weights()).unwrap();
    assert_eq!(weights.weight("xgb"), Some(0.7));

    let hotness = HotnessTable::load(&files.hotness()).unwrap();
    assert_eq!(hotness.lookup("Midtown Center", 0, 8), Some(0.92));

    let duration = DurationTable::load(&files.duration()).unwrap();
    assert_eq!(duration.lookup("JFK Airport", "Midtown Center", 0, 8), Some(14.2));

    let columns_dir = locate_expected_columns(&[root.clone()], &files.dir).unwrap();
    let schema = ExpectedColumns::load_json(&expected_columns_file(&columns_dir, ModelKind::Xgb))
        .unwrap();
    assert_eq!(schema.len(), 5);
    assert!(!expected_columns_file(&columns_dir, ModelKind::Lgb).exists());
}
