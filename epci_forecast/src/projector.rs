//! Recursive projector
//!
//! A model trained to predict year `t` from the totals of `t-3..t-1` is rolled
//! forward by sliding those three lag columns. Each step feeds the previous
//! step's raw output back in; rounding only happens on the reported value.

use crate::error::{ForecastError, Result};
use crate::features::LagColumns;
use crate::trainer::TrainedModel;
use energy_math::Regressor;
use epci_data::schema::FORECAST_YEARS;
use epci_data::Metric;
use tracing::{debug, info};

/// Unrounded model output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawForecast(f64);

impl RawForecast {
    pub fn value(self) -> f64 {
        self.0
    }

    /// Reported value, rounded to the nearest integer with ties to even
    pub fn rounded(self) -> i64 {
        self.0.round_ties_even() as i64
    }
}

/// The three lag values fed to the model, oldest first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagWindow([f64; 3]);

impl LagWindow {
    /// Window made of observed values
    pub fn observed(oldest: f64, middle: f64, latest: f64) -> Self {
        Self([oldest, middle, latest])
    }

    pub fn values(&self) -> [f64; 3] {
        self.0
    }

    /// Drop the oldest lag and append a forecast
    pub fn shift(self, next: RawForecast) -> Self {
        let [_, middle, latest] = self.0;
        Self([middle, latest, next.value()])
    }
}

/// Rolls one fitted model forward for single feature rows
#[derive(Debug)]
pub struct Projector<'a, R: Regressor> {
    model: &'a R,
    lags: LagColumns,
}

impl<'a, R: Regressor> Projector<'a, R> {
    pub fn new(model: &'a R, lags: LagColumns) -> Self {
        Self { model, lags }
    }

    /// Predict from `base` with its lag columns replaced by `window`.
    ///
    /// Returns the raw prediction and the window for the next step.
    pub fn step(&self, base: &[f64], window: LagWindow) -> Result<(RawForecast, LagWindow)> {
        let mut row = base.to_vec();
        for (&index, value) in self.lags.indices().iter().zip(window.values()) {
            let slot = row.get_mut(index).ok_or_else(|| {
                ForecastError::ValidationError(format!(
                    "Lag column {} is outside a row of width {}",
                    index,
                    base.len()
                ))
            })?;
            *slot = value;
        }

        let predicted = self.model.predict(&[row])?;
        let raw = predicted.first().copied().map(RawForecast).ok_or_else(|| {
            ForecastError::ValidationError("Model returned no prediction".to_string())
        })?;
        Ok((raw, window.shift(raw)))
    }

    /// Project `steps` years past the terminal year of `base`.
    ///
    /// The first window is the last two observed lags followed by `terminal`,
    /// the observed value of the year the model was trained to predict.
    pub fn project(&self, base: &[f64], terminal: f64, steps: usize) -> Result<Vec<RawForecast>> {
        let [_, middle, latest] = self.lags.indices();
        let (middle, latest) = match (base.get(middle), base.get(latest)) {
            (Some(&m), Some(&l)) => (m, l),
            _ => {
                return Err(ForecastError::ValidationError(format!(
                    "Lag columns are outside a row of width {}",
                    base.len()
                )))
            }
        };

        let mut window = LagWindow::observed(middle, latest, terminal);
        let mut forecasts = Vec::with_capacity(steps);
        for _ in 0..steps {
            let (raw, next) = self.step(base, window)?;
            forecasts.push(raw);
            window = next;
        }
        Ok(forecasts)
    }
}

/// Reported values of one unit: the observed terminal year then each
/// forecast year
pub type ProjectedRow = [i64; FORECAST_YEARS.len() + 1];

/// Projection of every unit for one metric, in table order
#[derive(Debug, Clone, PartialEq)]
pub struct MetricProjection {
    pub metric: Metric,
    pub rows: Vec<ProjectedRow>,
}

/// Project every unit the model was trained on across `FORECAST_YEARS`
pub fn project_table(trained: &TrainedModel) -> Result<MetricProjection> {
    let metric = trained.metric();
    let features = trained.features();
    let lags = LagColumns::resolve(features, metric, trained.target_year())?;
    let projector = Projector::new(trained.model(), lags);

    let mut rows = Vec::with_capacity(features.len());
    for (base, &terminal) in features.rows().iter().zip(trained.targets()) {
        let forecasts = projector.project(base, terminal, FORECAST_YEARS.len())?;
        let mut reported: ProjectedRow = [0; FORECAST_YEARS.len() + 1];
        reported[0] = RawForecast(terminal).rounded();
        for (slot, raw) in reported[1..].iter_mut().zip(&forecasts) {
            *slot = raw.rounded();
        }
        debug!("{} projection {:?}", metric, reported);
        rows.push(reported);
    }

    info!(
        "Projected {} for {} units over {:?}",
        metric,
        rows.len(),
        FORECAST_YEARS
    );
    Ok(MetricProjection { metric, rows })
}
