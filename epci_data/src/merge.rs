//! Merge engine: the consolidated per-unit feature table
//!
//! Production and consumption tables are left-joined onto the ratio base by
//! unit id. Units absent from a metric table get zero for every value of that
//! metric, and per-capita values are derived from the yearly totals.

use crate::error::{DataError, Result};
use crate::records::normalize_id;
use crate::schema::{merged_columns, EnergySource, Metric, N_YEARS, YEARS};
use crate::transform::{MetricRow, RatioTable, UnitInfo, WideMetricTable};
use serde_json::{Number, Value};
use std::collections::HashMap;
use tracing::{info, warn};

/// A single cell of the merged table.
///
/// This is the serialization contract for every output: text stays text,
/// integers are written without a fraction, floats keep theirs.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl ColumnValue {
    /// Numeric view of the cell; text has none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Text(_) => None,
            ColumnValue::Int(v) => Some(*v as f64),
            ColumnValue::Float(v) => Some(*v),
        }
    }

    /// JSON value for GeoJSON properties. Non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            ColumnValue::Text(s) => Value::String(s.clone()),
            ColumnValue::Int(v) => Value::Number((*v).into()),
            ColumnValue::Float(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
        }
    }
}

/// One unit of the merged feature table
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub unit: UnitInfo,
    /// Ratio per year, 1 decimal, zero when not reported
    pub ratios: [f64; N_YEARS],
    pub pop_percentage: f64,
    pub production: MetricRow,
    pub consumption: MetricRow,
    /// Truncated per-capita totals, production then consumption
    pub per_capita: [[i64; N_YEARS]; 2],
}

impl MergedRow {
    pub fn metric(&self, metric: Metric) -> &MetricRow {
        match metric {
            Metric::Production => &self.production,
            Metric::Consumption => &self.consumption,
        }
    }

    pub fn per_capita(&self, metric: Metric, year: usize) -> i64 {
        self.per_capita[metric_slot(metric)][year]
    }

    /// Cells in the order of `schema::merged_columns`
    pub fn cells(&self) -> Vec<ColumnValue> {
        let mut cells = vec![
            ColumnValue::Text(self.unit.siren_epci.clone()),
            ColumnValue::Text(self.unit.nom_complet.clone()),
            ColumnValue::Text(self.unit.forme_epci.clone()),
            ColumnValue::Int(self.unit.population as i64),
            ColumnValue::Int(self.unit.commune_count as i64),
        ];
        cells.extend(self.ratios.iter().map(|&r| ColumnValue::Float(r)));
        cells.push(ColumnValue::Float(self.pop_percentage));

        for metric in Metric::ALL {
            let row = self.metric(metric);
            for year in 0..N_YEARS {
                for source in EnergySource::ALL {
                    cells.push(ColumnValue::Int(row.value(year, source)));
                }
            }
            cells.extend((0..N_YEARS).map(|y| ColumnValue::Int(row.total(y))));
        }

        for year in 0..N_YEARS {
            for metric in Metric::ALL {
                cells.push(ColumnValue::Int(self.per_capita(metric, year)));
            }
        }

        cells
    }
}

fn metric_slot(metric: Metric) -> usize {
    match metric {
        Metric::Production => 0,
        Metric::Consumption => 1,
    }
}

/// The merged feature table, one row per ratio unit
#[derive(Debug, Clone, Default)]
pub struct MergedTable {
    rows: Vec<MergedRow>,
    index: HashMap<String, usize>,
}

impl MergedTable {
    /// Build a table from rows, rejecting duplicate unit ids
    pub fn from_rows(rows: Vec<MergedRow>) -> Result<Self> {
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if index.insert(row.unit.siren_epci.clone(), i).is_some() {
                return Err(DataError::InvalidData(format!(
                    "Duplicate unit id {}",
                    row.unit.siren_epci
                )));
            }
        }
        Ok(Self { rows, index })
    }

    pub fn rows(&self) -> &[MergedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for a unit id
    pub fn get(&self, unit_id: &str) -> Option<&MergedRow> {
        self.index.get(unit_id).map(|&i| &self.rows[i])
    }

    /// Row for an identifier as found in a GeoJSON property
    pub fn lookup(&self, id: &Value) -> Result<Option<&MergedRow>> {
        Ok(self.get(&normalize_id(id)?))
    }

    /// Names of every column, in cell order
    pub fn column_names() -> Vec<String> {
        merged_columns().into_iter().map(|(name, _)| name).collect()
    }
}

/// Per-capita value before truncation.
///
/// A zero population has no meaningful per-capita value; it yields 0.
pub fn per_capita(total: i64, population: u64) -> f64 {
    if population == 0 {
        0.0
    } else {
        total as f64 / population as f64
    }
}

/// Left-join production and consumption onto the ratio base
pub fn merge(
    ratio: &RatioTable,
    production: &WideMetricTable,
    consumption: &WideMetricTable,
) -> Result<MergedTable> {
    let mut unmatched = [0usize; 2];
    let mut rows = Vec::with_capacity(ratio.len());

    for base in ratio.rows() {
        let id = base.unit.siren_epci.as_str();
        let production_row = production.get(id).copied().unwrap_or_else(|| {
            unmatched[0] += 1;
            MetricRow::default()
        });
        let consumption_row = consumption.get(id).copied().unwrap_or_else(|| {
            unmatched[1] += 1;
            MetricRow::default()
        });

        if base.unit.population == 0 {
            warn!("Unit {} has zero population, per-capita values set to 0", id);
        }

        let mut per_capita_values = [[0i64; N_YEARS]; 2];
        for (slot, row) in [production_row, consumption_row].iter().enumerate() {
            for (year, value) in per_capita_values[slot].iter_mut().enumerate() {
                *value = per_capita(row.total(year), base.unit.population).trunc() as i64;
            }
        }

        rows.push(MergedRow {
            unit: base.unit.clone(),
            ratios: base.ratios.map(|r| r.unwrap_or(0.0)),
            pop_percentage: base.pop_percentage,
            production: production_row,
            consumption: consumption_row,
            per_capita: per_capita_values,
        });
    }

    info!(
        "Merged {} units over {:?} ({} without production, {} without consumption)",
        rows.len(),
        YEARS,
        unmatched[0],
        unmatched[1]
    );
    MergedTable::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ProductionRecord, RatioRecord};
    use crate::transform::{pivot, transform_production, transform_ratio};
    use approx::assert_relative_eq;

    fn ratio_records(insee: &str, pop: u64) -> Vec<RatioRecord> {
        YEARS
            .iter()
            .enumerate()
            .map(|(i, &an)| RatioRecord {
                insee: insee.to_string(),
                nom: "X".to_string(),
                forme: "F".to_string(),
                pop,
                nbcom: 2,
                an,
                ratioenr: 10.0 + i as f64,
            })
            .collect()
    }

    #[test]
    fn test_zero_population_per_capita() {
        assert_eq!(per_capita(1_000, 0), 0.0);
        assert_relative_eq!(per_capita(1_000, 3) * 3.0, 1_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_merge_with_zero_population_unit() {
        let ratio = transform_ratio(&ratio_records("Z9", 0)).unwrap();
        let production = transform_production(&[ProductionRecord {
            insee: "Z9".to_string(),
            an: 2022,
            detail: "Eolien".to_string(),
            prod: 1.0,
        }])
        .unwrap();
        let consumption = pivot(Metric::Consumption, &[]).unwrap();

        let merged = merge(&ratio, &production, &consumption).unwrap();
        let row = merged.get("Z9").unwrap();
        assert_eq!(row.production.total(3), 1000);
        assert_eq!(row.per_capita(Metric::Production, 3), 0);
        assert_eq!(row.pop_percentage, 0.0);
    }

    #[test]
    fn test_cells_align_with_columns() {
        let ratio = transform_ratio(&ratio_records("A1", 100)).unwrap();
        let empty = pivot(Metric::Production, &[]).unwrap();
        let merged = merge(&ratio, &empty, &pivot(Metric::Consumption, &[]).unwrap()).unwrap();

        let cells = merged.rows()[0].cells();
        assert_eq!(cells.len(), MergedTable::column_names().len());
        assert_eq!(cells[0], ColumnValue::Text("A1".to_string()));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let ratio = transform_ratio(&ratio_records("A1", 100)).unwrap();
        let empty = pivot(Metric::Production, &[]).unwrap();
        let merged = merge(&ratio, &empty, &pivot(Metric::Consumption, &[]).unwrap()).unwrap();

        let mut rows = merged.rows().to_vec();
        rows.push(rows[0].clone());
        assert!(MergedTable::from_rows(rows).is_err());
    }

    #[test]
    fn test_json_contract() {
        assert_eq!(ColumnValue::Int(3).to_json(), serde_json::json!(3));
        assert_eq!(ColumnValue::Float(13.0).to_json(), serde_json::json!(13.0));
        assert_eq!(ColumnValue::Float(f64::NAN).to_json(), Value::Null);
        assert_eq!(ColumnValue::Text("a".into()).as_f64(), None);
    }
}
