//! Pipeline stages: consolidation, then forecasting

use crate::config::{
    PipelineConfig, BOUNDARIES_FILE, CONSUMPTION_FILE, FORECAST_CSV, FORECAST_GEOJSON, MERGED_CSV,
    MERGED_GEOJSON, PRODUCTION_FILE, RATIO_FILE,
};
use anyhow::{Context, Result};
use epci_data::io::{
    merged_to_frame, read_feature_collection, read_merged_csv, write_csv, write_feature_collection,
};
use epci_data::records::{ConsumptionRecord, ProductionRecord, RatioRecord};
use epci_data::transform::{transform_consumption, transform_production, transform_ratio};
use epci_data::{enrich_features, load_records, merge, FeatureCollection, MergedTable};
use epci_forecast::{enrich_with_forecasts, forecast_table, predictions_to_frame, PredictionTable};
use std::fs;
use tracing::{info, warn};

/// What the consolidation stage produced
#[derive(Debug, Clone)]
pub struct Consolidated {
    pub table: MergedTable,
    pub features: FeatureCollection,
}

/// Merge the three datasets and enrich the boundaries with the result.
///
/// Writes `processed_data_no_ml.csv` and `epci_no_ml.geojson`.
pub fn process(config: &PipelineConfig) -> Result<Consolidated> {
    let ratio_path = config.dataset_file(RATIO_FILE);
    let ratio = load_records::<RatioRecord, _>(&ratio_path)
        .with_context(|| format!("Failed to load {}", ratio_path.display()))?;
    let prod_path = config.dataset_file(PRODUCTION_FILE);
    let prod = load_records::<ProductionRecord, _>(&prod_path)
        .with_context(|| format!("Failed to load {}", prod_path.display()))?;
    let conso_path = config.dataset_file(CONSUMPTION_FILE);
    let conso = load_records::<ConsumptionRecord, _>(&conso_path)
        .with_context(|| format!("Failed to load {}", conso_path.display()))?;

    let table = merge::merge(
        &transform_ratio(&ratio).context("Failed to pivot ratio records")?,
        &transform_production(&prod).context("Failed to pivot production records")?,
        &transform_consumption(&conso).context("Failed to pivot consumption records")?,
    )?;

    fs::create_dir_all(config.output_dir())
        .with_context(|| format!("Failed to create {}", config.output_dir().display()))?;
    let mut frame = merged_to_frame(&table)?;
    write_csv(&mut frame, config.output_file(MERGED_CSV))?;

    let boundaries_path = config.dataset_file(BOUNDARIES_FILE);
    let boundaries = read_feature_collection(&boundaries_path)
        .with_context(|| format!("Failed to load {}", boundaries_path.display()))?;
    let features = enrich_features(&boundaries, &table)?;
    write_feature_collection(&features, config.output_file(MERGED_GEOJSON))?;

    info!("Consolidated {} units", table.len());
    Ok(Consolidated { table, features })
}

/// Train, project and write `processed_data_ml.csv` and `epci_ml.geojson`
pub fn forecast_from(
    config: &PipelineConfig,
    consolidated: &Consolidated,
) -> Result<PredictionTable> {
    let predictions = forecast_table(&consolidated.table, &config.trainer())
        .context("Failed to forecast yearly totals")?;

    fs::create_dir_all(config.output_dir())
        .with_context(|| format!("Failed to create {}", config.output_dir().display()))?;
    let mut frame = predictions_to_frame(&consolidated.table, &predictions)?;
    write_csv(&mut frame, config.output_file(FORECAST_CSV))?;

    if consolidated.features.features.is_empty() {
        warn!("GeoJSON data is empty");
    } else {
        info!("GeoJSON data has {} features", consolidated.features.features.len());
    }
    let features = enrich_with_forecasts(&consolidated.features, &predictions)?;
    write_feature_collection(&features, config.output_file(FORECAST_GEOJSON))?;

    Ok(predictions)
}

/// Forecast from the outputs of a previous `process` run
pub fn forecast(config: &PipelineConfig) -> Result<PredictionTable> {
    let csv_path = config.output_file(MERGED_CSV);
    let table = read_merged_csv(&csv_path)
        .with_context(|| format!("Failed to read {}", csv_path.display()))?;
    let geojson_path = config.output_file(MERGED_GEOJSON);
    let features = read_feature_collection(&geojson_path)
        .with_context(|| format!("Failed to read {}", geojson_path.display()))?;

    forecast_from(config, &Consolidated { table, features })
}

/// Both stages, without reading the intermediate files back
pub fn run(config: &PipelineConfig) -> Result<PredictionTable> {
    let consolidated = process(config)?;
    forecast_from(config, &consolidated)
}
