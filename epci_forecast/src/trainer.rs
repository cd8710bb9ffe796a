//! Forecast trainer: one random forest per metric, learning the terminal
//! observed year's total from the earlier years.

use crate::error::{ForecastError, Result};
use crate::features::{metric_totals, FeatureMatrix};
use energy_math::validation::{cross_val_score, select, train_test_split};
use energy_math::{ForestParams, RandomForest, Regressor};
use epci_data::schema::YEARS;
use epci_data::{MergedTable, Metric};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Training settings shared by both metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub forest: ForestParams,
    /// Share of rows held out for the test score
    pub test_size: f64,
    /// Folds of the cross-validated score
    pub cv_folds: usize,
    /// Year whose total is the target; its columns never appear as features
    pub target_year: i32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            test_size: 0.2,
            cv_folds: 5,
            target_year: YEARS[YEARS.len() - 1],
        }
    }
}

impl TrainerConfig {
    fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ForecastError::ValidationError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.cv_folds < 2 {
            return Err(ForecastError::ValidationError(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        Ok(())
    }
}

/// Fit diagnostics. Scores that could not be computed on the data at hand
/// are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingReport {
    pub train_r2: Option<f64>,
    pub test_r2: Option<f64>,
    pub cv_r2: Option<Vec<f64>>,
}

impl TrainingReport {
    /// Mean of the per-fold scores
    pub fn cv_mean(&self) -> Option<f64> {
        self.cv_r2
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| s.iter().sum::<f64>() / s.len() as f64)
    }
}

/// A forest fitted on every unit, with the data it was fitted on
#[derive(Debug, Clone)]
pub struct TrainedModel {
    metric: Metric,
    target_year: i32,
    model: RandomForest,
    features: FeatureMatrix,
    targets: Vec<f64>,
    report: TrainingReport,
}

impl TrainedModel {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn target_year(&self) -> i32 {
        self.target_year
    }

    pub fn model(&self) -> &RandomForest {
        &self.model
    }

    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    /// Observed target values, in table order
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }
}

/// Fit a forest predicting `total_{metric}_{target_year}`.
///
/// Train, held-out and cross-validated R² are logged for information only;
/// the returned model is always refit on the full table.
pub fn train(table: &MergedTable, metric: Metric, config: &TrainerConfig) -> Result<TrainedModel> {
    config.validate()?;
    let target_column = metric.total_column(config.target_year);
    let targets = metric_totals(table, metric, config.target_year)?;
    let features = FeatureMatrix::from_table(table, config.target_year)?;

    if features.is_empty() || features.width() == 0 {
        return Err(ForecastError::Config(format!(
            "No features to learn {} from ({} rows, {} columns)",
            target_column,
            features.len(),
            features.width()
        )));
    }

    info!(
        "Training {} on {} units with {} features",
        target_column,
        features.len(),
        features.width()
    );

    let template = RandomForest::new(config.forest)?;
    let (train_r2, test_r2) = match holdout_scores(&template, &features, &targets, config) {
        Ok((train_r2, test_r2)) => {
            info!("Training R2 for {}: {:.4}", target_column, train_r2);
            info!("Test R2 for {}: {:.4}", target_column, test_r2);
            (Some(train_r2), Some(test_r2))
        }
        Err(e) => {
            warn!("Skipping held-out scores for {}: {}", target_column, e);
            (None, None)
        }
    };

    let mut model = template.clone();
    model.fit(features.rows(), &targets)?;

    let cv_r2 = match cross_val_score(&template, features.rows(), &targets, config.cv_folds) {
        Ok(scores) => Some(scores),
        Err(e) => {
            warn!("Skipping cross-validation for {}: {}", target_column, e);
            None
        }
    };
    let report = TrainingReport {
        train_r2,
        test_r2,
        cv_r2,
    };
    if let Some(mean) = report.cv_mean() {
        info!("Cross-validation R2 for {}: {:.4}", target_column, mean);
    }

    Ok(TrainedModel {
        metric,
        target_year: config.target_year,
        model,
        features,
        targets,
        report,
    })
}

fn holdout_scores(
    template: &RandomForest,
    features: &FeatureMatrix,
    targets: &[f64],
    config: &TrainerConfig,
) -> Result<(f64, f64)> {
    let (train_rows, test_rows) =
        train_test_split(features.len(), config.test_size, config.forest.seed)?;
    let train_x = select(features.rows(), &train_rows);
    let train_y = select(targets, &train_rows);

    let mut model = template.clone();
    model.fit(&train_x, &train_y)?;
    let train_r2 = model.score(&train_x, &train_y)?;
    let test_r2 = model.score(&select(features.rows(), &test_rows), &select(targets, &test_rows))?;
    Ok((train_r2, test_r2))
}
