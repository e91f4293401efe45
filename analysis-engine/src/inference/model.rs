//! Tree-ensemble classifiers loaded from JSON artifacts.
//!
//! The external trainers export fitted forests as a flat node list per tree.
//! Two ensemble types are understood:
//!
//! - `random_forest`: each leaf holds per-class counts (or fractions);
//!   `predict_proba` is the mean of the normalized leaf distributions.
//! - `gradient_boosted`: binary only; each leaf holds one margin, the
//!   margins are summed with `base_score` and passed through the logistic
//!   function.
//!
//! A split sends a sample left when `x[feature] <= threshold`.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::ArtifactError;

/// Prediction capabilities the engine needs from a trained model.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    /// Class values in the column order of `predict_proba`.
    fn classes(&self) -> &[i64];

    fn predict_proba(&self, x: &[f64]) -> Vec<f64>;

    fn feature_importances(&self) -> &[f64];

    /// Class with the highest probability; the first one wins a tie.
    fn predict(&self, x: &[f64]) -> i64 {
        let proba = self.predict_proba(x);
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        self.classes()[best]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleKind {
    RandomForest,
    GradientBoosted,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn leaf(&self, x: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }

    /// Children must point strictly forward so traversal always terminates.
    fn validate(
        &self,
        tree: usize,
        n_features: usize,
        kind: EnsembleKind,
        leaf_width: usize,
    ) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err(format!("tree {} has no nodes", tree));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    threshold,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "tree {} node {} splits on feature {} of {}",
                            tree, i, feature, n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("tree {} node {} has a non-finite threshold", tree, i));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(format!(
                                "tree {} node {} has invalid child index {}",
                                tree, i, child
                            ));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != leaf_width {
                        return Err(format!(
                            "tree {} leaf {} has {} values, expected {}",
                            tree,
                            i,
                            value.len(),
                            leaf_width
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite()) {
                        return Err(format!("tree {} leaf {} has a non-finite value", tree, i));
                    }
                    // forest leaves are class distributions
                    if kind == EnsembleKind::RandomForest
                        && (value.iter().any(|v| *v < 0.0) || value.iter().sum::<f64>() <= 0.0)
                    {
                        return Err(format!(
                            "tree {} leaf {} is not a class distribution",
                            tree, i
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub schema_version: Option<String>,
    pub model_type: EnsembleKind,
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub feature_importances: Vec<f64>,
    /// Initial margin for gradient boosting (log-odds space).
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    pub fn from_path(path: &Path) -> Result<Self, ArtifactError> {
        let data = fs::read(path)?;
        let model: TreeEnsemble = serde_json::from_slice(&data)?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.n_features == 0 {
            return Err(ArtifactError::Invalid("model declares zero features".into()));
        }
        if self.classes.len() < 2 {
            return Err(ArtifactError::Invalid("model needs at least two classes".into()));
        }
        if self.model_type == EnsembleKind::GradientBoosted && self.classes.len() != 2 {
            return Err(ArtifactError::Invalid(
                "gradient boosted models must be binary".into(),
            ));
        }
        if self.feature_importances.len() != self.n_features {
            return Err(ArtifactError::Invalid(format!(
                "{} feature importances for {} features",
                self.feature_importances.len(),
                self.n_features
            )));
        }
        if self.feature_importances.iter().any(|v| !v.is_finite()) {
            return Err(ArtifactError::Invalid(
                "feature importances contain non-finite values".into(),
            ));
        }
        if !self.base_score.is_finite() {
            return Err(ArtifactError::Invalid("base score is not finite".into()));
        }
        if self.trees.is_empty() {
            return Err(ArtifactError::Invalid("model has no trees".into()));
        }

        let leaf_width = match self.model_type {
            EnsembleKind::RandomForest => self.classes.len(),
            EnsembleKind::GradientBoosted => 1,
        };
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.n_features, self.model_type, leaf_width)
                .map_err(ArtifactError::Invalid)?;
        }
        Ok(())
    }

    fn forest_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf(x);
            let total: f64 = leaf.iter().sum();
            if total > 0.0 {
                for (acc, v) in proba.iter_mut().zip(leaf) {
                    *acc += v / total;
                }
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    fn boosted_proba(&self, x: &[f64]) -> Vec<f64> {
        let margin = self
            .trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + tree.leaf(x)[0]);
        let positive = 1.0 / (1.0 + (-margin).exp());
        vec![1.0 - positive, positive]
    }
}

impl Classifier for TreeEnsemble {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        match self.model_type {
            EnsembleKind::RandomForest => self.forest_proba(x),
            EnsembleKind::GradientBoosted => self.boosted_proba(x),
        }
    }

    fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stump_forest() -> TreeEnsemble {
        serde_json::from_value(json!({
            "model_type": "random_forest",
            "n_features": 2,
            "classes": [0, 1],
            "feature_importances": [0.75, 0.25],
            "trees": [
                { "nodes": [
                    { "feature": 0, "threshold": 0.0, "left": 1, "right": 2 },
                    { "value": [9.0, 1.0] },
                    { "value": [1.0, 3.0] }
                ]},
                { "nodes": [
                    { "feature": 1, "threshold": 1.0, "left": 1, "right": 2 },
                    { "value": [0.5, 0.5] },
                    { "value": [0.0, 1.0] }
                ]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_forest_averages_normalized_leaves() {
        let forest = stump_forest();
        forest.validate().unwrap();

        // tree 0 -> left (0.9, 0.1), tree 1 -> left (0.5, 0.5)
        let proba = forest.predict_proba(&[-1.0, 0.0]);
        assert!((proba[0] - 0.7).abs() < 1e-12);
        assert!((proba[1] - 0.3).abs() < 1e-12);
        assert_eq!(forest.predict(&[-1.0, 0.0]), 0);

        // tree 0 -> right (0.25, 0.75), tree 1 -> right (0, 1)
        let proba = forest.predict_proba(&[2.0, 5.0]);
        assert!((proba[1] - 0.875).abs() < 1e-12);
        assert_eq!(forest.predict(&[2.0, 5.0]), 1);
    }

    #[test]
    fn test_threshold_is_inclusive_on_the_left() {
        let forest = stump_forest();
        let at = forest.predict_proba(&[0.0, 1.0]);
        let below = forest.predict_proba(&[-0.5, 0.5]);
        assert_eq!(at, below);
    }

    #[test]
    fn test_boosted_logistic_output() {
        let model: TreeEnsemble = serde_json::from_value(json!({
            "model_type": "gradient_boosted",
            "n_features": 1,
            "classes": [0, 1],
            "feature_importances": [1.0],
            "base_score": 0.0,
            "trees": [
                { "nodes": [
                    { "feature": 0, "threshold": 0.5, "left": 1, "right": 2 },
                    { "value": [-2.0] },
                    { "value": [2.0] }
                ]}
            ]
        }))
        .unwrap();
        model.validate().unwrap();

        let proba = model.predict_proba(&[1.0]);
        let expected = 1.0 / (1.0 + (-2.0f64).exp());
        assert!((proba[1] - expected).abs() < 1e-12);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
        assert_eq!(model.predict(&[1.0]), 1);
        assert_eq!(model.predict(&[0.0]), 0);
    }

    #[test]
    fn test_rejects_backward_child() {
        let mut forest = stump_forest();
        forest.trees[0].nodes[0] = TreeNode::Split {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 2,
        };
        assert!(matches!(forest.validate(), Err(ArtifactError::Invalid(_))));
    }

    #[test]
    fn test_rejects_unknown_feature_and_bad_leaf() {
        let mut forest = stump_forest();
        forest.trees[1].nodes[0] = TreeNode::Split {
            feature: 7,
            threshold: 1.0,
            left: 1,
            right: 2,
        };
        assert!(forest.validate().is_err());

        let mut forest = stump_forest();
        forest.trees[0].nodes[1] = TreeNode::Leaf { value: vec![1.0] };
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_rejects_leaves_that_are_not_distributions() {
        let mut forest = stump_forest();
        forest.trees[0].nodes[1] = TreeNode::Leaf { value: vec![-1.0, 2.0] };
        assert!(matches!(forest.validate(), Err(ArtifactError::Invalid(_))));

        let mut forest = stump_forest();
        forest.trees[0].nodes[2] = TreeNode::Leaf { value: vec![0.0, 0.0] };
        assert!(matches!(forest.validate(), Err(ArtifactError::Invalid(_))));

        let mut forest = stump_forest();
        forest.trees[1].nodes[1] = TreeNode::Leaf { value: vec![f64::NAN, 1.0] };
        assert!(matches!(forest.validate(), Err(ArtifactError::Invalid(_))));
    }

    #[test]
    fn test_rejects_non_finite_model_parameters() {
        let mut forest = stump_forest();
        forest.feature_importances[0] = f64::INFINITY;
        assert!(matches!(forest.validate(), Err(ArtifactError::Invalid(_))));

        let mut boosted: TreeEnsemble = serde_json::from_value(json!({
            "model_type": "gradient_boosted",
            "n_features": 1,
            "classes": [0, 1],
            "feature_importances": [1.0],
            "trees": [ { "nodes": [ { "value": [-0.5] } ] } ]
        }))
        .unwrap();
        // negative margins are normal for boosting
        assert!(boosted.validate().is_ok());

        boosted.base_score = f64::NAN;
        assert!(matches!(boosted.validate(), Err(ArtifactError::Invalid(_))));
    }

    #[test]
    fn test_rejects_importance_length_mismatch() {
        let mut forest = stump_forest();
        forest.feature_importances.push(0.0);
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_tie_goes_to_first_class() {
        let forest: TreeEnsemble = serde_json::from_value(json!({
            "model_type": "random_forest",
            "n_features": 1,
            "classes": [0, 1],
            "feature_importances": [1.0],
            "trees": [ { "nodes": [ { "value": [1.0, 1.0] } ] } ]
        }))
        .unwrap();
        assert_eq!(forest.predict(&[3.0]), 0);
    }
}
