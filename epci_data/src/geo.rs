//! GeoJSON features and geometry-safe enrichment
//!
//! Features are kept as loosely-typed JSON apart from the parts the pipeline
//! touches: the geometry coordinates and the property map. Unknown members
//! of the collection and of each feature are carried through untouched.

use crate::error::{DataError, Result};
use crate::merge::MergedTable;
use crate::schema::unit;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::{debug, info, warn};

/// A GeoJSON FeatureCollection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A GeoJSON Feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feature {
    /// The `siren_epci` property; its absence is a data-contract fault
    pub fn unit_id(&self) -> Result<&Value> {
        self.properties
            .get(unit::SIREN_EPCI)
            .ok_or_else(|| DataError::MissingProperty(unit::SIREN_EPCI.to_string()))
    }
}

/// Round every scalar in a nested coordinate array to 3 decimals.
///
/// Integers are left as integers; nesting and order are preserved.
pub fn round_coordinates(coords: &Value) -> Result<Value> {
    match coords {
        Value::Number(n) if n.is_f64() => {
            let rounded = n.as_f64().map(round3).and_then(Number::from_f64);
            rounded
                .map(Value::Number)
                .ok_or_else(|| DataError::UnsupportedLeaf(n.to_string()))
        }
        Value::Number(_) => Ok(coords.clone()),
        Value::Array(items) => items
            .iter()
            .map(round_coordinates)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Err(DataError::UnsupportedLeaf(other.to_string())),
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Round the coordinates of a Polygon or MultiPolygon geometry in place.
///
/// Other geometry types are left as they are.
pub fn round_geometry(geometry: &mut Value) -> Result<()> {
    let kind = geometry.get("type").and_then(Value::as_str).map(str::to_owned);
    match kind.as_deref() {
        Some("Polygon") | Some("MultiPolygon") => {
            let coords = geometry
                .get_mut("coordinates")
                .ok_or_else(|| DataError::MissingProperty("coordinates".to_string()))?;
            let rounded = round_coordinates(coords)?;
            *coords = rounded;
        }
        other => debug!("Leaving {:?} geometry unrounded", other),
    }
    Ok(())
}

/// Round every feature's geometry and merge the matching table row into its
/// properties. Features whose unit is absent from the table keep their
/// properties and only have their geometry rounded.
pub fn enrich_features(
    collection: &FeatureCollection,
    table: &MergedTable,
) -> Result<FeatureCollection> {
    let names = MergedTable::column_names();
    let mut enriched = collection.clone();
    let mut missed = 0usize;

    for feature in &mut enriched.features {
        if let Some(geometry) = feature.geometry.as_mut() {
            round_geometry(geometry)?;
        }

        let id = feature.unit_id()?.clone();
        match table.lookup(&id)? {
            Some(row) => {
                for (name, cell) in names.iter().zip(row.cells()).skip(1) {
                    feature.properties.insert(name.clone(), cell.to_json());
                }
            }
            None => {
                missed += 1;
                warn!("No merged row for feature {}", id);
            }
        }
    }

    info!(
        "Enriched {} of {} features",
        enriched.features.len() - missed,
        enriched.features.len()
    );
    Ok(enriched)
}
