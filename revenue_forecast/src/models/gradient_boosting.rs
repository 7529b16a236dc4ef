//! Gradient-boosted regression trees over calendar features

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::models::{MonthFeatures, PredictedPoint};

/// Feature a tree node splits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeFeature {
    /// One-based calendar month
    Month,
    Quarter,
    Year,
    /// Months since the ensemble's reference date
    MonthIndex,
}

/// A node of a regression tree. Children are indices into the tree's node list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go `left` when `feature < threshold`, otherwise `right`
    Split {
        feature: TreeFeature,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single regression tree, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn evaluate(&self, features: &MonthFeatures) -> Result<f64> {
        let mut index = 0;

        // A well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..self.nodes.len() {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = match feature {
                        TreeFeature::Month => (features.month0 + 1) as f64,
                        TreeFeature::Quarter => features.quarter,
                        TreeFeature::Year => features.year,
                        TreeFeature::MonthIndex => features.offset,
                    };
                    index = if x < *threshold { *left } else { *right };
                }
                None => {
                    return Err(ForecastError::Prediction(format!(
                        "Tree references missing node {}",
                        index
                    )))
                }
            }
        }

        Err(ForecastError::Prediction(
            "Tree traversal did not reach a leaf".to_string(),
        ))
    }
}

/// Boosted ensemble: `base_score + Σ tree(x)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    pub reference_date: NaiveDate,
    #[serde(default)]
    pub base_score: f64,
    #[serde(alias = "booster")]
    pub trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    pub fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<PredictedPoint>> {
        if self.trees.is_empty() {
            return Err(ForecastError::Prediction(
                "Ensemble has no trees".to_string(),
            ));
        }

        dates
            .iter()
            .map(|&date| {
                let features = MonthFeatures::new(self.reference_date, date);
                let mut value = self.base_score;
                for tree in &self.trees {
                    value += tree.evaluate(&features)?;
                }
                Ok(PredictedPoint::point(value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn stump(feature: TreeFeature, threshold: f64, low: f64, high: f64) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: low },
                TreeNode::Leaf { value: high },
            ],
        }
    }

    #[test]
    fn test_ensemble_sums_trees() {
        let model = GradientBoostedTrees {
            reference_date: date(2024, 1),
            base_score: 100.0,
            trees: vec![
                stump(TreeFeature::Month, 7.0, 10.0, 20.0),
                stump(TreeFeature::Quarter, 4.0, 1.0, 5.0),
            ],
        };

        let points = model.predict(&[date(2025, 3), date(2025, 11)]).unwrap();

        assert_relative_eq!(points[0].value, 111.0);
        assert_relative_eq!(points[1].value, 125.0);
        assert_eq!(points[0].lower, None);
    }

    #[test]
    fn test_dangling_child_fails() {
        let model = GradientBoostedTrees {
            reference_date: date(2024, 1),
            base_score: 0.0,
            trees: vec![RegressionTree {
                nodes: vec![TreeNode::Split {
                    feature: TreeFeature::Year,
                    threshold: 2000.0,
                    left: 5,
                    right: 5,
                }],
            }],
        };

        assert!(matches!(
            model.predict(&[date(2025, 1)]),
            Err(ForecastError::Prediction(_))
        ));
    }

    #[test]
    fn test_cyclic_tree_fails() {
        let model = GradientBoostedTrees {
            reference_date: date(2024, 1),
            base_score: 0.0,
            trees: vec![RegressionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: TreeFeature::MonthIndex,
                        threshold: 0.0,
                        left: 1,
                        right: 1,
                    },
                    TreeNode::Split {
                        feature: TreeFeature::MonthIndex,
                        threshold: 0.0,
                        left: 0,
                        right: 0,
                    },
                ],
            }],
        };

        assert!(model.predict(&[date(2025, 1)]).is_err());
    }

    #[test]
    fn test_node_json_shape() {
        let node: TreeNode = serde_json::from_str(r#"{"kind": "leaf", "value": 2.5}"#).unwrap();
        assert_eq!(node, TreeNode::Leaf { value: 2.5 });
    }
}
