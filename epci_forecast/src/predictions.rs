//! Prediction table: `pred_total_{metric}_{year}` per unit

use crate::error::{ForecastError, Result};
use crate::projector::{MetricProjection, ProjectedRow};
use epci_data::io::merged_to_frame;
use epci_data::records::normalize_id;
use epci_data::schema::{FORECAST_YEARS, YEARS};
use epci_data::{MergedTable, Metric};
use polars::prelude::*;
use serde_json::Value;
use std::collections::HashMap;

/// Column order of the predictions appended to the merged table
pub const OUTPUT_ORDER: [Metric; 2] = [Metric::Consumption, Metric::Production];

/// The terminal observed year followed by every forecast year
pub fn prediction_years() -> Vec<i32> {
    std::iter::once(YEARS[YEARS.len() - 1])
        .chain(FORECAST_YEARS)
        .collect()
}

/// Reported predictions of one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPrediction {
    pub siren_epci: String,
    pub production: ProjectedRow,
    pub consumption: ProjectedRow,
}

impl UnitPrediction {
    pub fn values(&self, metric: Metric) -> &ProjectedRow {
        match metric {
            Metric::Production => &self.production,
            Metric::Consumption => &self.consumption,
        }
    }

    /// Prediction for one year of `prediction_years`
    pub fn value(&self, metric: Metric, year: i32) -> Option<i64> {
        prediction_years()
            .iter()
            .position(|&y| y == year)
            .map(|i| self.values(metric)[i])
    }
}

/// Predictions keyed by unit id, in merged-table order
#[derive(Debug, Clone, Default)]
pub struct PredictionTable {
    rows: Vec<UnitPrediction>,
    index: HashMap<String, usize>,
}

impl PredictionTable {
    /// Pair both projections with the units of the table they were made from
    pub fn from_projections(
        table: &MergedTable,
        production: &MetricProjection,
        consumption: &MetricProjection,
    ) -> Result<Self> {
        for (projection, expected) in [
            (production, Metric::Production),
            (consumption, Metric::Consumption),
        ] {
            if projection.metric != expected {
                return Err(ForecastError::ValidationError(format!(
                    "Expected a {} projection, got {}",
                    expected, projection.metric
                )));
            }
            if projection.rows.len() != table.len() {
                return Err(ForecastError::ValidationError(format!(
                    "{} projection has {} rows for {} units",
                    projection.metric,
                    projection.rows.len(),
                    table.len()
                )));
            }
        }

        let rows: Vec<UnitPrediction> = table
            .rows()
            .iter()
            .zip(production.rows.iter().zip(&consumption.rows))
            .map(|(row, (p, c))| UnitPrediction {
                siren_epci: row.unit.siren_epci.clone(),
                production: *p,
                consumption: *c,
            })
            .collect();
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.siren_epci.clone(), i))
            .collect();
        Ok(Self { rows, index })
    }

    pub fn rows(&self) -> &[UnitPrediction] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, unit_id: &str) -> Option<&UnitPrediction> {
        self.index.get(unit_id).map(|&i| &self.rows[i])
    }

    /// Predictions for an identifier as found in a GeoJSON property
    pub fn lookup(&self, id: &Value) -> Result<Option<&UnitPrediction>> {
        Ok(self.get(&normalize_id(id)?))
    }

    /// Names of the prediction columns, in output order
    pub fn column_names() -> Vec<String> {
        OUTPUT_ORDER
            .iter()
            .flat_map(|m| prediction_years().into_iter().map(move |y| m.prediction_column(y)))
            .collect()
    }

    /// Prediction columns as series, in output order
    pub fn to_series(&self) -> Vec<Series> {
        let years = prediction_years();
        OUTPUT_ORDER
            .iter()
            .flat_map(|&metric| {
                years.iter().enumerate().map(move |(i, &year)| {
                    let values: Vec<i64> = self.rows.iter().map(|r| r.values(metric)[i]).collect();
                    Series::new(&metric.prediction_column(year), values)
                })
            })
            .collect()
    }
}

/// The merged table with every prediction column appended
pub fn predictions_to_frame(
    table: &MergedTable,
    predictions: &PredictionTable,
) -> Result<DataFrame> {
    let aligned = table.len() == predictions.len()
        && table
            .rows()
            .iter()
            .zip(predictions.rows())
            .all(|(t, p)| t.unit.siren_epci == p.siren_epci);
    if !aligned {
        return Err(ForecastError::ValidationError(
            "Predictions do not follow the merged table's units".to_string(),
        ));
    }

    let mut df = merged_to_frame(table)?;
    df.hstack_mut(&predictions.to_series())?;
    Ok(df)
}
