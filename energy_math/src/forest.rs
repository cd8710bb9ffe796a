//! Bootstrap random forest regressor
//!
//! Every tree is grown on a bootstrap resample of the training rows drawn
//! from a single seeded generator, so two forests with the same parameters
//! fitted on the same data are identical. Predictions average the trees.

use crate::tree::{RegressionTree, TreeParams};
use crate::{check_training_shape, MathError, Regressor, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Random forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees
    pub n_trees: usize,
    /// Per-tree growth limits
    pub tree: TreeParams,
    /// Seed for bootstrap sampling
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            tree: TreeParams::default(),
            seed: 99,
        }
    }
}

/// Averaging ensemble of bootstrapped regression trees
#[derive(Debug, Clone)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Create an unfitted forest
    pub fn new(params: ForestParams) -> Result<Self> {
        if params.n_trees == 0 {
            return Err(MathError::InvalidInput(
                "A forest needs at least one tree".to_string(),
            ));
        }
        // Validates the tree parameters up front
        RegressionTree::new(params.tree)?;

        Ok(Self {
            params,
            trees: Vec::new(),
        })
    }

    /// Whether `fit` has completed
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        let n = features.len();
        check_training_shape(features, targets)?;

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut trees = Vec::with_capacity(self.params.n_trees);
        for _ in 0..self.params.n_trees {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut tree = RegressionTree::new(self.params.tree)?;
            tree.fit_rows(features, targets, sample)?;
            trees.push(tree);
        }

        self.trees = trees;
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        let first = self.trees.first().ok_or_else(|| {
            MathError::NotFitted("Random forest has not been fitted".to_string())
        })?;
        first.check_predict_input(features)?;

        let mut sums = vec![0.0; features.len()];
        for tree in &self.trees {
            for (sum, value) in sums.iter_mut().zip(tree.predict_unchecked(features)) {
                *sum += value;
            }
        }

        let n_trees = self.trees.len() as f64;
        Ok(sums.into_iter().map(|s| s / n_trees).collect())
    }
}
