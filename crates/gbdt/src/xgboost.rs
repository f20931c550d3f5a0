//! Importer for XGBoost's JSON model format (`Booster.save_model("*.json")`)

use crate::model::{Ensemble, ModelError, ModelSource, FORMAT_VERSION};
use crate::objective::Objective;
use crate::tree::{MissingRule, Node, SplitRule, Tree};
use serde::Deserialize;

#[derive(Deserialize)]
struct Document {
    learner: Learner,
}

#[derive(Deserialize)]
struct Learner {
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: ObjectiveSpec,
}

/// Booster attributes are all strings; the sklearn wrapper records
/// `best_iteration` here after early stopping.
#[derive(Deserialize, Default)]
struct Attributes {
    #[serde(default)]
    best_iteration: Option<String>,
}

#[derive(Deserialize)]
struct LearnerModelParam {
    base_score: serde_json::Value,
    #[serde(default)]
    num_class: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ObjectiveSpec {
    name: String,
}

#[derive(Deserialize)]
#[serde(tag = "name")]
enum GradientBooster {
    #[serde(rename = "gbtree")]
    GbTree { model: GbTreeModel },
    #[serde(rename = "dart")]
    Dart {
        gbtree: GbTreeBooster,
        weight_drop: Vec<f64>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize)]
struct GbTreeBooster {
    model: GbTreeModel,
}

#[derive(Deserialize)]
struct GbTreeModel {
    #[serde(default)]
    gbtree_model_param: Option<GbTreeModelParam>,
    trees: Vec<RawTree>,
}

#[derive(Deserialize)]
struct GbTreeModelParam {
    #[serde(default)]
    num_parallel_tree: Option<serde_json::Value>,
}

impl GbTreeModel {
    fn trees_per_round(&self) -> usize {
        self.gbtree_model_param
            .as_ref()
            .and_then(|p| p.num_parallel_tree.as_ref())
            .and_then(parse_number)
            .filter(|n| *n >= 1.0)
            .map_or(1, |n| n as usize)
    }
}

#[derive(Deserialize)]
struct RawTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i32>,
    split_conditions: Vec<f64>,
    #[serde(default)]
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<i32>,
}

/// Older exports write `default_left` as 0/1, newer ones as booleans.
#[derive(Deserialize, Clone, Copy)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

/// Convert a parsed XGBoost JSON document into an [`Ensemble`].
pub fn import(value: serde_json::Value) -> Result<Ensemble, ModelError> {
    let doc: Document = serde_json::from_value(value)?;
    let learner = doc.learner;

    if let Some(num_class) = learner.learner_model_param.num_class.as_ref() {
        let classes = parse_number(num_class).unwrap_or(0.0);
        if classes > 1.0 {
            return Err(ModelError::Unsupported(format!(
                "multi-class XGBoost model ({classes} classes)"
            )));
        }
    }

    let objective = Objective::from_xgboost(&learner.objective.name).ok_or_else(|| {
        ModelError::Unsupported(format!("XGBoost objective {}", learner.objective.name))
    })?;

    let base_score = parse_number(&learner.learner_model_param.base_score).ok_or_else(|| {
        ModelError::InvalidFormat(format!(
            "unreadable base_score {}",
            learner.learner_model_param.base_score
        ))
    })?;

    let (mut raw_trees, mut weights, per_round) = match learner.gradient_booster {
        GradientBooster::GbTree { model } => {
            let weights = vec![1.0; model.trees.len()];
            let per_round = model.trees_per_round();
            (model.trees, weights, per_round)
        }
        GradientBooster::Dart {
            gbtree,
            weight_drop,
        } => {
            if weight_drop.len() != gbtree.model.trees.len() {
                return Err(ModelError::InvalidFormat(format!(
                    "dart model has {} trees but {} drop weights",
                    gbtree.model.trees.len(),
                    weight_drop.len()
                )));
            }
            let per_round = gbtree.model.trees_per_round();
            (gbtree.model.trees, weight_drop, per_round)
        }
        GradientBooster::Unsupported => {
            return Err(ModelError::Unsupported(
                "only gbtree and dart boosters are supported".to_string(),
            ))
        }
    };

    // Predictions stop at the early-stopping round, as the sklearn wrapper does.
    if let Some(best) = best_iteration(&learner.attributes)? {
        let keep = best.saturating_add(1).saturating_mul(per_round);
        raw_trees.truncate(keep);
        weights.truncate(keep);
    }

    let trees = raw_trees
        .into_iter()
        .zip(weights)
        .enumerate()
        .map(|(i, (raw, weight))| convert_tree(i, raw, weight))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Ensemble {
        version: FORMAT_VERSION,
        source: ModelSource::Xgboost,
        objective,
        base_margin: objective.base_score_to_margin(base_score),
        average_output: false,
        feature_names: learner.feature_names,
        trees,
    })
}

fn convert_tree(index: usize, raw: RawTree, weight: f64) -> Result<Tree, ModelError> {
    let n = raw.left_children.len();
    if raw.right_children.len() != n
        || raw.split_indices.len() != n
        || raw.split_conditions.len() != n
    {
        return Err(ModelError::InvalidFormat(format!(
            "tree {index} has inconsistent array lengths"
        )));
    }
    if raw.split_type.iter().any(|&t| t != 0) {
        return Err(ModelError::Unsupported(format!(
            "tree {index} uses categorical splits"
        )));
    }

    let nodes = (0..n)
        .map(|i| {
            let id = i as i32;
            if raw.left_children[i] == -1 {
                // Leaf outputs are stored in split_conditions.
                Node::leaf(id, raw.split_conditions[i])
            } else {
                let default_left = raw.default_left.get(i).map_or(true, |f| f.is_set());
                Node::internal(
                    id,
                    raw.split_indices[i],
                    raw.split_conditions[i],
                    raw.left_children[i],
                    raw.right_children[i],
                )
                .with_default_left(default_left)
                .with_missing(MissingRule::NanIsMissing)
            }
        })
        .collect();

    Ok(Tree::with_split(nodes, weight, SplitRule::LessThan))
}

fn best_iteration(attributes: &Attributes) -> Result<Option<usize>, ModelError> {
    attributes
        .best_iteration
        .as_deref()
        .map(|raw| {
            raw.trim().parse::<usize>().map_err(|_| {
                ModelError::InvalidFormat(format!("unreadable best_iteration {raw}"))
            })
        })
        .transpose()
}

/// `base_score` appears as `"5E-1"`, `"[5E-1]"` or a bare number depending on version.
fn parse_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .next()?
            .trim()
            .parse()
            .ok(),
        serde_json::Value::Array(items) => items.first().and_then(parse_number),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number(&json!("5E-1")), Some(0.5));
        assert_eq!(parse_number(&json!("[2.5E0]")), Some(2.5));
        assert_eq!(parse_number(&json!(1.25)), Some(1.25));
        assert_eq!(parse_number(&json!(["3"])), Some(3.0));
        assert_eq!(parse_number(&json!(null)), None);
    }

    #[test]
    fn test_best_iteration_attribute() {
        let parsed = |attrs: serde_json::Value| {
            let attrs: Attributes = serde_json::from_value(attrs).unwrap();
            best_iteration(&attrs)
        };
        assert_eq!(parsed(json!({})).unwrap(), None);
        assert_eq!(parsed(json!({"best_iteration": "4", "best_score": "0.3"})).unwrap(), Some(4));
        assert!(parsed(json!({"best_iteration": "four"})).is_err());
    }

    #[test]
    fn test_flag_variants() {
        let flags: Vec<Flag> = serde_json::from_value(json!([0, 1, true, false])).unwrap();
        let set: Vec<bool> = flags.into_iter().map(Flag::is_set).collect();
        assert_eq!(set, vec![false, true, true, false]);
    }
}
