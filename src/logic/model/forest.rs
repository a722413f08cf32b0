//! Random Forest
//!
//! Bagged ensemble of `linfa_trees::DecisionTree`s (Gini impurity).
//! Each tree is fitted on a bootstrap draw of the training rows and
//! votes for a class; the attack probability is the share of trees
//! voting attack.

use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::ModelError;

const NORMAL_CLASS: usize = 0;
const ATTACK_CLASS: usize = 1;

/// Forest hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 5,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// Bagged ensemble of decision trees
pub struct RandomForest {
    trees: Vec<DecisionTree<f64, usize>>,
    n_features: usize,
}

impl std::fmt::Debug for RandomForest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomForest")
            .field("n_trees", &self.trees.len())
            .field("n_features", &self.n_features)
            .finish()
    }
}

impl RandomForest {
    /// Fit the forest on a feature matrix and binary labels
    pub fn fit(rows: &[Vec<f64>], labels: &[bool], params: &ForestParams) -> Result<Self, ModelError> {
        if rows.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if rows.len() != labels.len() {
            return Err(ModelError::LabelMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }
        let n_features = rows[0].len();
        if n_features == 0 || rows.iter().any(|r| r.len() != n_features) {
            return Err(ModelError::RaggedFeatures);
        }
        if params.n_trees == 0 {
            return Err(ModelError::InvalidParams("n_trees must be at least 1".to_string()));
        }

        let records = Array2::from_shape_vec((rows.len(), n_features), rows.concat())
            .map_err(|e| ModelError::InvalidParams(e.to_string()))?;
        let targets: Array1<usize> = labels
            .iter()
            .map(|&attack| if attack { ATTACK_CLASS } else { NORMAL_CLASS })
            .collect();

        let tree_params = DecisionTree::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(Some(params.max_depth))
            .min_weight_split(params.min_samples_split as f32)
            .min_weight_leaf(1.0);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);
        for _ in 0..params.n_trees {
            let bootstrap: Vec<usize> = (0..rows.len()).map(|_| rng.gen_range(0..rows.len())).collect();
            let sample = Dataset::new(
                records.select(Axis(0), &bootstrap),
                targets.select(Axis(0), &bootstrap),
            );

            let tree = tree_params
                .clone()
                .fit(&sample)
                .map_err(|e| ModelError::Fit(e.to_string()))?;
            trees.push(tree);
        }

        Ok(Self { trees, n_features })
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        debug_assert_eq!(row.len(), self.n_features);
        let Ok(record) = Array2::from_shape_vec((1, row.len()), row.to_vec()) else {
            return 0.0;
        };

        let votes = self
            .trees
            .iter()
            .filter(|tree| tree.predict(&record).get(0) == Some(&ATTACK_CLASS))
            .count();
        (votes as f64 / self.trees.len() as f64).clamp(0.0, 1.0)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<bool>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..100 {
            rows.push(vec![i as f64, (i % 3) as f64]);
            labels.push(i >= 50);
        }
        (rows, labels)
    }

    #[test]
    fn test_forest_separates_threshold() {
        let (rows, labels) = separable();
        let forest = RandomForest::fit(&rows, &labels, &ForestParams::default()).unwrap();

        assert_eq!(forest.n_trees(), 100);
        assert_eq!(forest.n_features(), 2);
        assert!(forest.predict_proba(&[90.0, 0.0]) > 0.9);
        assert!(forest.predict_proba(&[5.0, 1.0]) < 0.1);
    }

    #[test]
    fn test_constant_features_do_not_flatten_probabilities() {
        // Only the middle column carries signal; the others never vary.
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![0.0, if i < 20 { 100.0 } else { 30_000.0 }, 0.0])
            .collect();
        let labels: Vec<bool> = (0..40).map(|i| i >= 20).collect();

        let forest = RandomForest::fit(&rows, &labels, &ForestParams::default()).unwrap();
        let attack = forest.predict_proba(&[0.0, 40_000.0, 0.0]);
        let benign = forest.predict_proba(&[0.0, 50.0, 0.0]);

        assert!(attack > 0.95, "attack = {attack}");
        assert!(benign < 0.05, "benign = {benign}");
    }

    #[test]
    fn test_single_class_yields_constant_probability() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![false, false, false];
        let forest = RandomForest::fit(&rows, &labels, &ForestParams::default()).unwrap();
        assert_eq!(forest.predict_proba(&[2.0]), 0.0);
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let params = ForestParams::default();
        assert!(matches!(
            RandomForest::fit(&[], &[], &params),
            Err(ModelError::EmptyTrainingSet)
        ));
        assert!(matches!(
            RandomForest::fit(&[vec![1.0]], &[true, false], &params),
            Err(ModelError::LabelMismatch { .. })
        ));
        assert!(matches!(
            RandomForest::fit(&[vec![1.0], vec![1.0, 2.0]], &[true, false], &params),
            Err(ModelError::RaggedFeatures)
        ));
        let no_trees = ForestParams {
            n_trees: 0,
            ..Default::default()
        };
        assert!(matches!(
            RandomForest::fit(&[vec![1.0]], &[true], &no_trees),
            Err(ModelError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_same_seed_same_model() {
        let (rows, labels) = separable();
        let a = RandomForest::fit(&rows, &labels, &ForestParams::default()).unwrap();
        let b = RandomForest::fit(&rows, &labels, &ForestParams::default()).unwrap();

        for row in [[0.0, 0.0], [49.5, 1.0], [51.0, 2.0], [99.0, 0.0]] {
            assert_eq!(a.predict_proba(&row), b.predict_proba(&row));
        }
    }
}
