//! Importer for LightGBM's JSON dump (`Booster.dump_model()`)
//!
//! The dump nests each tree recursively; nodes are flattened pre-order so
//! every child index is greater than its parent's.

use crate::model::{Ensemble, ModelError, ModelSource, FORMAT_VERSION};
use crate::objective::Objective;
use crate::tree::{MissingRule, Node, SplitRule, Tree};
use serde::Deserialize;

#[derive(Deserialize)]
struct Dump {
    #[serde(default = "one")]
    num_class: u32,
    #[serde(default)]
    objective: Option<String>,
    #[serde(default)]
    average_output: bool,
    #[serde(default)]
    feature_names: Vec<String>,
    tree_info: Vec<TreeInfo>,
}

fn one() -> u32 {
    1
}

#[derive(Deserialize)]
struct TreeInfo {
    tree_structure: RawNode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNode {
    Split(Box<RawSplit>),
    Leaf(RawLeaf),
}

#[derive(Deserialize)]
struct RawSplit {
    split_feature: i32,
    threshold: serde_json::Value,
    #[serde(default = "le")]
    decision_type: String,
    #[serde(default = "yes")]
    default_left: bool,
    #[serde(default = "none")]
    missing_type: String,
    left_child: RawNode,
    right_child: RawNode,
}

#[derive(Deserialize)]
struct RawLeaf {
    leaf_value: f64,
}

fn le() -> String {
    "<=".to_string()
}

fn yes() -> bool {
    true
}

fn none() -> String {
    "None".to_string()
}

/// Convert a parsed LightGBM dump into an [`Ensemble`].
pub fn import(value: serde_json::Value) -> Result<Ensemble, ModelError> {
    let dump: Dump = serde_json::from_value(value)?;

    if dump.num_class > 1 {
        return Err(ModelError::Unsupported(format!(
            "multi-class LightGBM model ({} classes)",
            dump.num_class
        )));
    }

    let objective = dump
        .objective
        .as_deref()
        .map(Objective::from_lightgbm)
        .unwrap_or_default();

    let trees = dump
        .tree_info
        .into_iter()
        .enumerate()
        .map(|(i, info)| convert_tree(i, info.tree_structure))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Ensemble {
        version: FORMAT_VERSION,
        source: ModelSource::Lightgbm,
        objective,
        base_margin: 0.0,
        average_output: dump.average_output,
        feature_names: dump.feature_names,
        trees,
    })
}

fn convert_tree(index: usize, root: RawNode) -> Result<Tree, ModelError> {
    let mut nodes = Vec::new();
    flatten(index, root, &mut nodes)?;
    Ok(Tree::with_split(nodes, 1.0, SplitRule::LessOrEqual))
}

fn flatten(tree: usize, node: RawNode, nodes: &mut Vec<Node>) -> Result<i32, ModelError> {
    let id = nodes.len() as i32;

    match node {
        RawNode::Leaf(leaf) => {
            nodes.push(Node::leaf(id, leaf.leaf_value));
        }
        RawNode::Split(split) => {
            let split = *split;
            if split.decision_type != "<=" {
                return Err(ModelError::Unsupported(format!(
                    "tree {tree} uses decision type {}",
                    split.decision_type
                )));
            }

            let rule = match split.missing_type.as_str() {
                "None" => MissingRule::NanAsZero,
                "Zero" => MissingRule::ZeroIsMissing,
                "NaN" => MissingRule::NanIsMissing,
                other => {
                    return Err(ModelError::InvalidFormat(format!(
                        "tree {tree} has unknown missing_type {other}"
                    )))
                }
            };
            let threshold = parse_threshold(&split.threshold).ok_or_else(|| {
                ModelError::InvalidFormat(format!(
                    "tree {tree} has unreadable threshold {}",
                    split.threshold
                ))
            })?;

            // Reserve the slot, then patch child links once they are known.
            nodes.push(
                Node::internal(id, split.split_feature, threshold, -1, -1)
                    .with_default_left(split.default_left)
                    .with_missing(rule),
            );
            let left = flatten(tree, split.left_child, nodes)?;
            let right = flatten(tree, split.right_child, nodes)?;
            let slot = &mut nodes[id as usize];
            slot.left = left;
            slot.right = right;
        }
    }

    Ok(id)
}

/// Thresholds are numbers, or strings such as `"1e+300"` for infinite splits.
fn parse_threshold(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_leaf_tree() {
        let model = import(json!({
            "objective": "regression",
            "feature_names": ["a"],
            "tree_info": [{"tree_structure": {"leaf_value": 0.75}}]
        }))
        .unwrap();
        assert_eq!(model.predict(&[123.0]), 0.75);
    }

    #[test]
    fn test_categorical_split_rejected() {
        let err = import(json!({
            "tree_info": [{"tree_structure": {
                "split_feature": 0, "threshold": "1||2", "decision_type": "==",
                "left_child": {"leaf_value": 1.0}, "right_child": {"leaf_value": 2.0}
            }}]
        }));
        assert!(matches!(err, Err(ModelError::Unsupported(_))));
    }

    #[test]
    fn test_flatten_is_preorder() {
        let model = import(json!({
            "tree_info": [{"tree_structure": {
                "split_feature": 0, "threshold": 1.0,
                "left_child": {
                    "split_feature": 1, "threshold": 2.0,
                    "left_child": {"leaf_value": 1.0},
                    "right_child": {"leaf_value": 2.0}
                },
                "right_child": {"leaf_value": 3.0}
            }}]
        }))
        .unwrap();

        let nodes = &model.trees[0].nodes;
        assert_eq!(nodes.len(), 5);
        assert_eq!((nodes[0].left, nodes[0].right), (1, 4));
        assert_eq!((nodes[1].left, nodes[1].right), (2, 3));
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[1.0, 5.0]), 2.0);
        assert_eq!(model.predict(&[1.5, 0.0]), 3.0);
    }
}
