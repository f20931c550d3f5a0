//! Decision tree structures for ensemble inference
//!
//! Nodes are stored flat; node 0 is the root and children are referenced by
//! index. XGBoost and LightGBM disagree on how a split compares (a per-tree
//! rule) and on how missing values are routed (a per-node rule).

use serde::{Deserialize, Serialize};

/// Comparison used at internal nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// Go left iff `value < threshold`, compared as `f32` (XGBoost).
    #[default]
    LessThan,
    /// Go left iff `value <= threshold` (LightGBM).
    LessOrEqual,
}

/// Routing of missing (NaN) and zero values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingRule {
    /// NaN follows the node's default direction.
    #[default]
    NanIsMissing,
    /// NaN and exact zero follow the node's default direction.
    ZeroIsMissing,
    /// NaN is compared as 0.0.
    NanAsZero,
}

/// A decision tree node (internal or leaf)
///
/// For internal nodes `feature_idx >= 0` and `left`/`right` index into the
/// owning tree's node list. Leaves carry `feature_idx == -1` and a value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Node ID (for reference, not used in traversal)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    #[serde(rename = "feature_idx", alias = "feature")]
    pub feature_idx: i32,

    /// Split threshold
    pub threshold: f64,

    /// Leaf value (Some for leaf nodes, None for internal nodes)
    pub leaf: Option<f64>,

    /// Direction taken by missing values
    #[serde(default = "default_left")]
    pub default_left: bool,

    /// What counts as a missing value at this split
    #[serde(default)]
    pub missing: MissingRule,
}

fn default_left() -> bool {
    true
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: f64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
            default_left: true,
            missing: MissingRule::NanIsMissing,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: f64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
            default_left: true,
            missing: MissingRule::NanIsMissing,
        }
    }

    /// Builder-style override of the missing-value direction.
    pub fn with_default_left(mut self, default_left: bool) -> Self {
        self.default_left = default_left;
        self
    }

    /// Builder-style override of the missing-value policy.
    pub fn with_missing(mut self, missing: MissingRule) -> Self {
        self.missing = missing;
        self
    }

    /// Check if this node is a leaf
    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }

    /// Get the leaf value if this is a leaf node
    pub fn leaf_value(&self) -> Option<f64> {
        self.leaf
    }
}

/// A single decision tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,

    /// Multiplier applied to the leaf output (1.0 except for DART drops)
    pub weight: f64,

    #[serde(default)]
    pub split: SplitRule,
}

impl Tree {
    /// Create a new tree with XGBoost semantics
    pub fn new(nodes: Vec<Node>, weight: f64) -> Self {
        Self {
            nodes,
            weight,
            split: SplitRule::LessThan,
        }
    }

    /// Create a tree with an explicit split comparison
    pub fn with_split(nodes: Vec<Node>, weight: f64, split: SplitRule) -> Self {
        Self {
            nodes,
            weight,
            split,
        }
    }

    /// Evaluate this tree on a feature vector.
    ///
    /// Malformed structure (dangling child, out-of-range feature) yields 0.0
    /// rather than panicking; `validate` reports those cases up front.
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;

        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..=self.nodes.len() {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };

            if node.is_leaf() {
                return node.leaf_value().unwrap_or(0.0);
            }

            let Some(&raw) = usize::try_from(node.feature_idx)
                .ok()
                .and_then(|i| features.get(i))
            else {
                return 0.0;
            };

            let next = match self.route(node, raw) {
                Direction::Left => node.left,
                Direction::Right => node.right,
            };
            if next < 0 {
                return 0.0;
            }
            idx = next as usize;
        }

        0.0
    }

    fn route(&self, node: &Node, raw: f64) -> Direction {
        let value = match node.missing {
            MissingRule::NanAsZero if raw.is_nan() => 0.0,
            _ => raw,
        };

        let missing = match node.missing {
            MissingRule::NanIsMissing => value.is_nan(),
            MissingRule::ZeroIsMissing => value.is_nan() || value == 0.0,
            MissingRule::NanAsZero => false,
        };
        if missing {
            return if node.default_left {
                Direction::Left
            } else {
                Direction::Right
            };
        }

        let go_left = match self.split {
            // XGBoost compares single-precision feature values.
            SplitRule::LessThan => (value as f32) < (node.threshold as f32),
            SplitRule::LessOrEqual => value <= node.threshold,
        };
        if go_left {
            Direction::Left
        } else {
            Direction::Right
        }
    }

    /// Get the root node
    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Highest feature index referenced by an internal node.
    pub fn max_feature_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter(|n| !n.is_leaf())
            .filter_map(|n| usize::try_from(n.feature_idx).ok())
            .max()
    }

    /// Validate tree structure
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }
        if !self.weight.is_finite() {
            return Err(format!("Tree weight is not finite: {}", self.weight));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if !node.is_leaf() {
                for (side, child) in [("left", node.left), ("right", node.right)] {
                    // Children must come after their parent, which also rules out cycles.
                    if child <= i as i32 || child as usize >= self.nodes.len() {
                        return Err(format!("Node {i} has invalid {side} child: {child}"));
                    }
                }

                if node.feature_idx < 0 {
                    return Err(format!(
                        "Internal node {} has invalid feature index: {}",
                        i, node.feature_idx
                    ));
                }

                if node.threshold.is_nan() {
                    return Err(format!("Internal node {i} has NaN threshold"));
                }
            } else {
                match node.leaf {
                    None => return Err(format!("Leaf node {i} has no leaf value")),
                    Some(v) if !v.is_finite() => {
                        return Err(format!("Leaf node {i} has non-finite value {v}"))
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

enum Direction {
    Left,
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(split: SplitRule, missing: MissingRule, default_left: bool) -> Tree {
        Tree::with_split(
            vec![
                Node::internal(0, 0, 50.0, 1, 2)
                    .with_default_left(default_left)
                    .with_missing(missing),
                Node::leaf(1, 100.0),
                Node::leaf(2, 200.0),
            ],
            1.0,
            split,
        )
    }

    #[test]
    fn test_node_creation() {
        let internal = Node::internal(0, 3, 12.5, 1, 2);
        assert_eq!(internal.feature_idx, 3);
        assert_eq!(internal.threshold, 12.5);
        assert!(!internal.is_leaf());

        let leaf = Node::leaf(1, -0.25);
        assert_eq!(leaf.feature_idx, -1);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.leaf_value(), Some(-0.25));
    }

    #[test]
    fn test_split_rules_differ_on_threshold() {
        let xgb = stump(SplitRule::LessThan, MissingRule::NanIsMissing, true);
        assert_eq!(xgb.evaluate(&[30.0]), 100.0);
        assert_eq!(xgb.evaluate(&[50.0]), 200.0); // Equal goes right
        assert_eq!(xgb.evaluate(&[60.0]), 200.0);

        let lgb = stump(SplitRule::LessOrEqual, MissingRule::NanAsZero, true);
        assert_eq!(lgb.evaluate(&[50.0]), 100.0); // Equal goes left
    }

    #[test]
    fn test_missing_value_routing() {
        let right = stump(SplitRule::LessThan, MissingRule::NanIsMissing, false);
        assert_eq!(right.evaluate(&[f64::NAN]), 200.0);
        assert_eq!(right.evaluate(&[0.0]), 100.0);

        let zero_missing = stump(SplitRule::LessOrEqual, MissingRule::ZeroIsMissing, false);
        assert_eq!(zero_missing.evaluate(&[0.0]), 200.0);

        // NaN compared as zero: 0 <= 50 goes left regardless of default direction.
        let nan_zero = stump(SplitRule::LessOrEqual, MissingRule::NanAsZero, false);
        assert_eq!(nan_zero.evaluate(&[f64::NAN]), 100.0);
    }

    #[test]
    fn test_malformed_trees_evaluate_to_zero() {
        let dangling = Tree::new(vec![Node::internal(0, 0, 1.0, 5, 6)], 1.0);
        assert_eq!(dangling.evaluate(&[0.0]), 0.0);
        assert!(dangling.validate().is_err());

        let short_features = stump(SplitRule::LessThan, MissingRule::NanIsMissing, true);
        assert_eq!(short_features.evaluate(&[]), 0.0);

        let empty = Tree::new(vec![], 1.0);
        assert_eq!(empty.evaluate(&[1.0]), 0.0);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_back_edges() {
        let cyclic = Tree::new(
            vec![
                Node::internal(0, 0, 1.0, 1, 2),
                Node::internal(1, 0, 1.0, 0, 2),
                Node::leaf(2, 1.0),
            ],
            1.0,
        );
        assert!(cyclic.validate().is_err());
        // Still terminates.
        let _ = cyclic.evaluate(&[0.0]);
    }

    #[test]
    fn test_max_feature_index() {
        let tree = Tree::new(
            vec![
                Node::internal(0, 4, 1.0, 1, 2),
                Node::leaf(1, 1.0),
                Node::internal(2, 7, 1.0, 3, 4),
                Node::leaf(3, 1.0),
                Node::leaf(4, 1.0),
            ],
            1.0,
        );
        assert_eq!(tree.max_feature_index(), Some(7));
        assert!(tree.validate().is_ok());
    }
}
