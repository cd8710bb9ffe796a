//! Forecast enrichment of GeoJSON features

use crate::error::Result;
use crate::predictions::PredictionTable;
use epci_data::schema::FORECAST_YEARS;
use epci_data::{FeatureCollection, Metric};
use serde_json::Value;
use tracing::{info, warn};

/// Copy the final-horizon predictions into each matching feature as
/// `pred_prod_{year}` and `pred_conso_{year}` integers. Unmatched features
/// are logged and left unchanged.
pub fn enrich_with_forecasts(
    collection: &FeatureCollection,
    predictions: &PredictionTable,
) -> Result<FeatureCollection> {
    let year = FORECAST_YEARS[FORECAST_YEARS.len() - 1];
    let mut enriched = collection.clone();
    let mut matched = 0usize;

    for feature in &mut enriched.features {
        let id = feature.unit_id()?.clone();
        let Some(unit) = predictions.lookup(&id)? else {
            warn!("No matching prediction for siren_epci {}", id);
            continue;
        };
        for metric in Metric::ALL {
            if let Some(value) = unit.value(metric, year) {
                feature
                    .properties
                    .insert(metric.forecast_property(year), Value::from(value));
            }
        }
        matched += 1;
    }

    info!(
        "Added {} forecasts to {} of {} features",
        year,
        matched,
        enriched.features.len()
    );
    Ok(enriched)
}
