//! End-to-end checks of the XGBoost and LightGBM importers against
//! hand-written exports shaped like the real library output.

use proptest::prelude::*;
use serde_json::{json, Value};
use taxiscore_gbdt::{Ensemble, ModelError, ModelSource, Objective};

fn xgb_tree(feature: i32, threshold: f64, left: f64, right: f64, default_left: Value) -> Value {
    json!({
        "base_weights": [0.0, left, right],
        "categories": [], "categories_nodes": [], "categories_segments": [], "categories_sizes": [],
        "default_left": default_left,
        "id": 0,
        "left_children": [1, -1, -1],
        "loss_changes": [1.0, 0.0, 0.0],
        "parents": [2147483647, 0, 0],
        "right_children": [2, -1, -1],
        "split_conditions": [threshold, left, right],
        "split_indices": [feature, 0, 0],
        "split_type": [0, 0, 0],
        "sum_hessian": [10.0, 5.0, 5.0],
        "tree_param": {"num_deleted": "0", "num_feature": "2", "num_nodes": "3", "size_leaf_vector": "1"}
    })
}

fn xgb_document(objective: &str, base_score: &str, booster: Value) -> String {
    json!({
        "learner": {
            "attributes": {},
            "feature_names": ["dropoff_zone_hotness", "sin_hour"],
            "feature_types": ["float", "float"],
            "gradient_booster": booster,
            "learner_model_param": {
                "base_score": base_score, "boost_from_average": "1",
                "num_class": "0", "num_feature": "2", "num_target": "1"
            },
            "objective": {"name": objective, "reg_loss_param": {"scale_pos_weight": "1"}}
        },
        "version": [2, 0, 3]
    })
    .to_string()
}

fn gbtree(trees: Vec<Value>) -> Value {
    let n = trees.len();
    json!({
        "name": "gbtree",
        "model": {
            "gbtree_model_param": {"num_parallel_tree": "1", "num_trees": n.to_string()},
            "tree_info": vec![0; n],
            "trees": trees
        }
    })
}

fn two_tree_regressor() -> Ensemble {
    let doc = xgb_document(
        "reg:squarederror",
        "5E-1",
        gbtree(vec![
            xgb_tree(0, 0.5, -0.25, 0.25, json!([1, 0, 0])),
            xgb_tree(1, 0.0, 0.125, 0.5, json!([false, false, false])),
        ]),
    );
    Ensemble::from_json_str(&doc).unwrap()
}

#[test]
fn xgboost_regression_sums_leaves_and_base_score() {
    let model = two_tree_regressor();
    assert_eq!(model.source, ModelSource::Xgboost);
    assert_eq!(model.objective, Objective::Regression);
    assert_eq!(model.feature_names.len(), 2);

    // 0.2 < 0.5 -> -0.25 ; 1.0 >= 0.0 -> 0.5
    assert_eq!(model.predict(&[0.2, 1.0]), 0.75);
    // 0.7 >= 0.5 -> 0.25 ; -1.0 < 0.0 -> 0.125
    assert_eq!(model.predict(&[0.7, -1.0]), 0.875);
}

#[test]
fn xgboost_missing_values_follow_default_direction() {
    let model = two_tree_regressor();
    // Tree 0 sends NaN left, tree 1 sends NaN right.
    assert_eq!(model.predict(&[f64::NAN, f64::NAN]), 0.5 - 0.25 + 0.5);
}

#[test]
fn xgboost_logistic_base_score_is_in_probability_space() {
    let doc = xgb_document(
        "binary:logistic",
        "[5E-1]",
        gbtree(vec![xgb_tree(0, 0.5, 0.0, 0.0, json!([1, 0, 0]))]),
    );
    let model = Ensemble::from_json_str(&doc).unwrap();
    assert!(model.base_margin.abs() < 1e-12);
    assert!((model.predict(&[1.0, 1.0]) - 0.5).abs() < 1e-12);
}

#[test]
fn xgboost_dart_applies_drop_weights() {
    let booster = json!({
        "name": "dart",
        "gbtree": gbtree(vec![
            xgb_tree(0, 0.5, 1.0, 1.0, json!([1, 0, 0])),
            xgb_tree(0, 0.5, 1.0, 1.0, json!([1, 0, 0])),
        ]),
        "weight_drop": [0.5, 0.25]
    });
    let model = Ensemble::from_json_str(&xgb_document("reg:squarederror", "0", booster)).unwrap();
    assert_eq!(model.predict(&[0.0, 0.0]), 0.75);
}

#[test]
fn xgboost_early_stopping_drops_trailing_rounds() {
    let trees = vec![
        xgb_tree(0, 0.5, 1.0, 1.0, json!([1, 0, 0])),
        xgb_tree(0, 0.5, 2.0, 2.0, json!([1, 0, 0])),
        xgb_tree(0, 0.5, 4.0, 4.0, json!([1, 0, 0])),
    ];
    let mut doc: Value =
        serde_json::from_str(&xgb_document("reg:squarederror", "0", gbtree(trees))).unwrap();
    assert_eq!(Ensemble::from_json_str(&doc.to_string()).unwrap().predict(&[0.0, 0.0]), 7.0);

    doc["learner"]["attributes"] = json!({"best_iteration": "1", "best_score": "0.41"});
    let model = Ensemble::from_json_str(&doc.to_string()).unwrap();
    assert_eq!(model.num_trees(), 2);
    assert_eq!(model.predict(&[0.0, 0.0]), 3.0);
}

#[test]
fn xgboost_rejects_unsupported_models() {
    let linear = json!({"name": "gblinear", "model": {"weights": [0.1, 0.2]}});
    assert!(matches!(
        Ensemble::from_json_str(&xgb_document("reg:squarederror", "0", linear)),
        Err(ModelError::Unsupported(_))
    ));

    let mut categorical = xgb_tree(0, 0.5, 1.0, 1.0, json!([1, 0, 0]));
    categorical["split_type"] = json!([1, 0, 0]);
    assert!(matches!(
        Ensemble::from_json_str(&xgb_document(
            "reg:squarederror",
            "0",
            gbtree(vec![categorical])
        )),
        Err(ModelError::Unsupported(_))
    ));

    assert!(matches!(
        Ensemble::from_json_str(&xgb_document(
            "rank:pairwise",
            "0",
            gbtree(vec![xgb_tree(0, 0.5, 1.0, 1.0, json!([1, 0, 0]))])
        )),
        Err(ModelError::Unsupported(_))
    ));
}

fn lightgbm_dump() -> String {
    json!({
        "name": "tree",
        "version": "v4",
        "num_class": 1,
        "num_tree_per_iteration": 1,
        "label_index": 0,
        "max_feature_idx": 1,
        "objective": "regression",
        "average_output": false,
        "feature_names": ["pickup_hour", "zoneID"],
        "monotone_constraints": [],
        "feature_infos": {},
        "tree_info": [
            {
                "tree_index": 0, "num_leaves": 2, "num_cat": 0, "shrinkage": 1,
                "tree_structure": {
                    "split_index": 0, "split_feature": 0, "split_gain": 10.0,
                    "threshold": 12.000000000000002, "decision_type": "<=",
                    "default_left": false, "missing_type": "NaN",
                    "internal_value": 0, "internal_weight": 0, "internal_count": 100,
                    "left_child": {"leaf_index": 0, "leaf_value": 1.5, "leaf_weight": 50, "leaf_count": 50},
                    "right_child": {"leaf_index": 1, "leaf_value": 2.5, "leaf_weight": 50, "leaf_count": 50}
                }
            },
            {
                "tree_index": 1, "num_leaves": 2, "num_cat": 0, "shrinkage": 0.1,
                "tree_structure": {
                    "split_index": 0, "split_feature": 1, "split_gain": 3.0,
                    "threshold": 100.5, "decision_type": "<=",
                    "default_left": true, "missing_type": "None",
                    "internal_value": 0, "internal_weight": 0, "internal_count": 100,
                    "left_child": {"leaf_index": 0, "leaf_value": -0.5, "leaf_weight": 50, "leaf_count": 50},
                    "right_child": {"leaf_index": 1, "leaf_value": 0.5, "leaf_weight": 50, "leaf_count": 50}
                }
            }
        ]
    })
    .to_string()
}

#[test]
fn lightgbm_dump_uses_inclusive_splits() {
    let model = Ensemble::from_json_str(&lightgbm_dump()).unwrap();
    assert_eq!(model.source, ModelSource::Lightgbm);
    assert_eq!(model.base_margin, 0.0);

    assert_eq!(model.predict(&[12.0, 100.5]), 1.0);
    assert_eq!(model.predict(&[13.0, 101.0]), 3.0);
}

#[test]
fn lightgbm_missing_types_are_per_split() {
    let model = Ensemble::from_json_str(&lightgbm_dump()).unwrap();
    // Tree 0: NaN is missing and default_left is false -> 2.5.
    // Tree 1: missing_type None compares NaN as 0 -> -0.5.
    assert_eq!(model.predict(&[f64::NAN, f64::NAN]), 2.0);
}

#[test]
fn imported_model_survives_native_round_trip() {
    let model = Ensemble::from_json_str(&lightgbm_dump()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    model.save_json(&path).unwrap();

    let reloaded = Ensemble::load_json(&path).unwrap();
    assert_eq!(reloaded, model);
    assert_eq!(reloaded.hash_hex().unwrap(), model.hash_hex().unwrap());
}

proptest! {
    #[test]
    fn batch_prediction_matches_row_by_row(
        rows in prop::collection::vec(prop::collection::vec(-50.0f64..150.0, 2), 1..40)
    ) {
        let model = Ensemble::from_json_str(&lightgbm_dump()).unwrap();
        let batch = model.predict_batch(&rows);
        for (row, value) in rows.iter().zip(batch) {
            prop_assert_eq!(model.predict(row), value);
        }
    }
}
