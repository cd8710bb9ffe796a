//! Model evaluation helpers
//!
//! Contains:
//! - R² (coefficient of determination)
//! - Seeded shuffled train/test split
//! - Contiguous k-fold split and cross-validated scoring

use crate::{MathError, Regressor, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Coefficient of determination of `predicted` against `actual`.
///
/// A constant `actual` scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(MathError::InvalidInput(
            "Actual and predicted values must have the same non-zero length".to_string(),
        ));
    }

    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }

    Ok(1.0 - ss_res / ss_tot)
}

/// Row indices of a shuffled split; the test side holds `ceil(n * test_ratio)` rows
pub fn train_test_split(
    n_rows: usize,
    test_ratio: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if test_ratio <= 0.0 || test_ratio >= 1.0 {
        return Err(MathError::InvalidInput(format!(
            "Test ratio must be between 0 and 1, got {}",
            test_ratio
        )));
    }

    let test_size = (n_rows as f64 * test_ratio).ceil() as usize;
    if test_size == 0 || test_size >= n_rows {
        return Err(MathError::InsufficientData(format!(
            "Cannot split {} rows with test ratio {}",
            n_rows, test_ratio
        )));
    }

    let mut rows: Vec<usize> = (0..n_rows).collect();
    rows.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = rows.split_off(test_size);

    Ok((train, rows))
}

/// Contiguous, unshuffled folds as `(train, test)` index pairs.
///
/// The first `n_rows % k` folds are one row larger than the rest.
pub fn k_fold(n_rows: usize, k: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if k < 2 {
        return Err(MathError::InvalidInput(
            "k-fold needs at least 2 folds".to_string(),
        ));
    }
    if n_rows < k {
        return Err(MathError::InsufficientData(format!(
            "Cannot make {} folds from {} rows",
            k, n_rows
        )));
    }

    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = n_rows / k + usize::from(fold < n_rows % k);
        let test: Vec<usize> = (start..start + size).collect();
        let train: Vec<usize> = (0..start).chain(start + size..n_rows).collect();
        folds.push((train, test));
        start += size;
    }

    Ok(folds)
}

/// Score of a fresh copy of `model` on each of `k` folds
pub fn cross_val_score<R: Regressor + Clone>(
    model: &R,
    features: &[Vec<f64>],
    targets: &[f64],
    k: usize,
) -> Result<Vec<f64>> {
    if features.len() != targets.len() {
        return Err(MathError::InvalidInput(format!(
            "Feature rows ({}) don't match targets ({})",
            features.len(),
            targets.len()
        )));
    }

    k_fold(features.len(), k)?
        .into_iter()
        .map(|(train, test)| {
            let mut fold_model = model.clone();
            fold_model.fit(&select(features, &train), &select(targets, &train))?;
            fold_model.score(&select(features, &test), &select(targets, &test))
        })
        .collect()
}

/// Copy the named rows, in order
pub fn select<T: Clone>(values: &[T], rows: &[usize]) -> Vec<T> {
    rows.iter().map(|&r| values[r].clone()).collect()
}
