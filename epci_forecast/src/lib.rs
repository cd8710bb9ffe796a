//! # EPCI Forecast
//!
//! Projects each unit's yearly production and consumption totals three years
//! past the last observed year.
//!
//! ## Features
//!
//! - Feature matrix built from the merged table, without the target year's
//!   columns and with the legal form one-hot encoded ([`features`])
//! - One seeded random forest per metric, with train, held-out and
//!   cross-validated R² logged ([`trainer`])
//! - Recursive projection that chains raw predictions and only rounds what it
//!   reports ([`projector`])
//! - Prediction columns for the merged CSV and GeoJSON properties for the
//!   final year ([`predictions`], [`enrich`])
//!
//! ## Quick Start
//!
//! ```no_run
//! use epci_data::io::read_merged_csv;
//! use epci_forecast::{forecast_table, TrainerConfig};
//!
//! let table = read_merged_csv("processed_data/processed_data_no_ml.csv")?;
//! let predictions = forecast_table(&table, &TrainerConfig::default())?;
//! println!("{} units projected", predictions.len());
//! # Ok::<(), epci_forecast::ForecastError>(())
//! ```

pub mod enrich;
pub mod error;
pub mod features;
pub mod predictions;
pub mod projector;
pub mod trainer;

// Re-export commonly used types
pub use crate::enrich::enrich_with_forecasts;
pub use crate::error::{ForecastError, Result};
pub use crate::predictions::{predictions_to_frame, PredictionTable, UnitPrediction};
pub use crate::projector::{project_table, LagWindow, MetricProjection, Projector, RawForecast};
pub use crate::trainer::{train, TrainedModel, TrainerConfig, TrainingReport};

use epci_data::{MergedTable, Metric};

/// Train and project both metrics, consumption first
pub fn forecast_table(table: &MergedTable, config: &TrainerConfig) -> Result<PredictionTable> {
    let consumption = project_table(&train(table, Metric::Consumption, config)?)?;
    let production = project_table(&train(table, Metric::Production, config)?)?;
    PredictionTable::from_projections(table, &production, &consumption)
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
