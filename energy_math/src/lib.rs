//! # Energy Math
//!
//! Regression primitives used to project yearly energy totals.
//! This crate provides a CART regression tree, a bootstrap random forest
//! built on it, and the scoring/splitting helpers used to report how well a
//! fitted model generalizes.

use thiserror::Error;

pub mod forest;
pub mod tree;
pub mod validation;

pub use forest::{ForestParams, RandomForest};
pub use tree::{RegressionTree, TreeParams};

/// Errors that can occur while fitting or evaluating a regressor
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model not fitted: {0}")]
    NotFitted(String),
}

/// Result type for regression operations
pub type Result<T> = std::result::Result<T, MathError>;

/// A model that learns a numeric target from rows of numeric features.
///
/// Rows are dense: every row of a matrix must have the same width, and the
/// width seen at `fit` time is the width `predict` expects.
pub trait Regressor: std::fmt::Debug {
    /// Fit the model on `features` (one row per sample) and `targets`
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()>;

    /// Predict one value per row
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Coefficient of determination of the predictions against `targets`
    fn score(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<f64> {
        let predicted = self.predict(features)?;
        validation::r2_score(targets, &predicted)
    }
}

/// Check that a feature matrix and its targets can be used for fitting.
///
/// Returns the row width.
pub(crate) fn check_training_shape(features: &[Vec<f64>], targets: &[f64]) -> Result<usize> {
    if features.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot fit on an empty feature matrix".to_string(),
        ));
    }
    if features.len() != targets.len() {
        return Err(MathError::InvalidInput(format!(
            "Feature rows ({}) don't match targets ({})",
            features.len(),
            targets.len()
        )));
    }
    let width = check_width(features)?;
    if width == 0 {
        return Err(MathError::InsufficientData(
            "Feature matrix has no columns".to_string(),
        ));
    }
    Ok(width)
}

/// Width shared by every row, or an error naming the first ragged row
pub(crate) fn check_width(features: &[Vec<f64>]) -> Result<usize> {
    let width = features.first().map(Vec::len).unwrap_or(0);
    if let Some(row) = features.iter().position(|r| r.len() != width) {
        return Err(MathError::InvalidInput(format!(
            "Row {} has {} features, expected {}",
            row,
            features[row].len(),
            width
        )));
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_shape_rejects_mismatch() {
        let features = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(check_training_shape(&features, &[1.0]).is_err());
        assert!(check_training_shape(&[], &[]).is_err());
        assert_eq!(check_training_shape(&features, &[1.0, 2.0]).unwrap(), 2);
    }

    #[test]
    fn test_ragged_rows() {
        let features = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            check_width(&features),
            Err(MathError::InvalidInput(_))
        ));
    }
}
