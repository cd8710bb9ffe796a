//! CART regression tree
//!
//! Nodes live in a flat arena; a split sends rows whose feature value is
//! `<= threshold` to the left child. Splits minimize the summed squared error
//! of the two children, and every leaf predicts the mean of its rows.

use crate::{check_training_shape, check_width, MathError, Regressor, Result};
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth; the root is depth 0
    pub max_depth: usize,
    /// Minimum number of rows a node needs before it may split
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 5,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Regression tree fitted with greedy variance reduction
#[derive(Debug, Clone)]
pub struct RegressionTree {
    params: TreeParams,
    nodes: Vec<Node>,
    n_features: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

impl RegressionTree {
    /// Create an unfitted tree
    pub fn new(params: TreeParams) -> Result<Self> {
        if params.min_samples_split < 2 {
            return Err(MathError::InvalidInput(
                "min_samples_split must be at least 2".to_string(),
            ));
        }

        Ok(Self {
            params,
            nodes: Vec::new(),
            n_features: 0,
        })
    }

    /// Fit on the subset of rows named by `rows`; rows may repeat.
    pub(crate) fn fit_rows(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        rows: Vec<usize>,
    ) -> Result<()> {
        self.n_features = check_training_shape(features, targets)?;
        if rows.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot fit a tree on zero rows".to_string(),
            ));
        }

        self.nodes.clear();
        self.grow(features, targets, rows, 0);
        Ok(())
    }

    /// Number of nodes, leaves included
    #[cfg(test)]
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf
    #[cfg(test)]
    fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + walk(nodes, left).max(walk(nodes, right))
                }
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    fn grow(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        rows: Vec<usize>,
        depth: usize,
    ) -> usize {
        let at = self.nodes.len();
        let value = mean(targets, &rows);
        self.nodes.push(Node::Leaf { value });

        if depth >= self.params.max_depth || rows.len() < self.params.min_samples_split {
            return at;
        }

        if let Some(split) = self.best_split(features, targets, &rows) {
            let left = self.grow(features, targets, split.left, depth + 1);
            let right = self.grow(features, targets, split.right, depth + 1);
            self.nodes[at] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
        }

        at
    }

    fn best_split(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        rows: &[usize],
    ) -> Option<BestSplit> {
        let n = rows.len() as f64;
        let total: f64 = rows.iter().map(|&r| targets[r]).sum();
        // Maximizing sum_l^2/n_l + sum_r^2/n_r minimizes the children's SSE.
        let parent_score = total * total / n;
        let mut best: Option<(usize, f64, f64)> = None;

        let mut sorted = rows.to_vec();
        for feature in 0..self.n_features {
            sorted.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

            let mut left_sum = 0.0;
            for i in 0..sorted.len() - 1 {
                left_sum += targets[sorted[i]];
                let here = features[sorted[i]][feature];
                let next = features[sorted[i + 1]][feature];
                if here == next {
                    continue;
                }

                let n_left = (i + 1) as f64;
                let n_right = n - n_left;
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / n_left + right_sum * right_sum / n_right;

                let improves = match best {
                    Some((_, _, best_score)) => score > best_score,
                    None => score > parent_score + 1e-12 * parent_score.abs().max(1.0),
                };
                if improves {
                    best = Some((feature, here + (next - here) / 2.0, score));
                }
            }
        }

        best.map(|(feature, threshold, _)| {
            let (left, right): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&r| features[r][feature] <= threshold);
            BestSplit {
                feature,
                threshold,
                left,
                right,
            }
        })
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub(crate) fn predict_unchecked(&self, features: &[Vec<f64>]) -> Vec<f64> {
        features.iter().map(|row| self.predict_row(row)).collect()
    }

    pub(crate) fn check_predict_input(&self, features: &[Vec<f64>]) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(MathError::NotFitted(
                "Regression tree has not been fitted".to_string(),
            ));
        }
        let width = check_width(features)?;
        if !features.is_empty() && width != self.n_features {
            return Err(MathError::InvalidInput(format!(
                "Expected {} features, got {}",
                self.n_features, width
            )));
        }
        Ok(())
    }
}

impl Regressor for RegressionTree {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        self.fit_rows(features, targets, (0..features.len()).collect())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.check_predict_input(features)?;
        Ok(self.predict_unchecked(features))
    }
}

fn mean(targets: &[f64], rows: &[usize]) -> f64 {
    rows.iter().map(|&r| targets[r]).sum::<f64>() / rows.len() as f64
}
