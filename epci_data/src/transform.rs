//! Category transformers: long-format records into wide per-unit tables
//!
//! - Ratio records become one row per unit with a ratio per year
//! - Production and consumption records become one row per unit with a value
//!   per (energy source, year) and a yearly total

use crate::error::{DataError, Result};
use crate::records::{ConsumptionRecord, ProductionRecord, RatioRecord};
use crate::schema::{year_index, EnergySource, Metric, N_SOURCES, N_YEARS};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Unit metadata carried by the ratio dataset
#[derive(Debug, Clone, PartialEq)]
pub struct UnitInfo {
    pub siren_epci: String,
    pub nom_complet: String,
    pub forme_epci: String,
    pub population: u64,
    pub commune_count: u64,
}

/// One unit of the ratio base table
#[derive(Debug, Clone, PartialEq)]
pub struct RatioRow {
    pub unit: UnitInfo,
    /// Ratio per year rounded to 1 decimal; `None` when the year was not reported
    pub ratios: [Option<f64>; N_YEARS],
    /// Share of the total population of the base table, rounded to 2 decimals
    pub pop_percentage: f64,
}

/// The ratio base table, one row per unit in first-seen order
#[derive(Debug, Clone, Default)]
pub struct RatioTable {
    rows: Vec<RatioRow>,
}

impl RatioTable {
    pub fn rows(&self) -> &[RatioRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A mapped, unit-converted production or consumption observation
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryObservation {
    pub unit_id: String,
    pub year: i32,
    pub source: EnergySource,
    pub value: i64,
}

/// Values of one unit for every (year, source) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricRow {
    values: [[i64; N_SOURCES]; N_YEARS],
}

impl MetricRow {
    /// Row from values indexed by year, then source
    pub fn from_values(values: [[i64; N_SOURCES]; N_YEARS]) -> Self {
        Self { values }
    }

    /// Value for a year index and source
    pub fn value(&self, year: usize, source: EnergySource) -> i64 {
        self.values[year][source.index()]
    }

    /// Sum of every source for a year index
    pub fn total(&self, year: usize) -> i64 {
        self.values[year].iter().sum()
    }

    fn add(&mut self, year: usize, source: EnergySource, value: i64) {
        self.values[year][source.index()] += value;
    }
}

/// Wide table of one metric keyed by unit id
#[derive(Debug, Clone)]
pub struct WideMetricTable {
    metric: Metric,
    rows: BTreeMap<String, MetricRow>,
}

impl WideMetricTable {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn get(&self, unit_id: &str) -> Option<&MetricRow> {
        self.rows.get(unit_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pivot the ratio records into the unit base table.
///
/// Metadata comes from the first record of each unit; duplicate (unit, year)
/// ratios are summed before rounding.
pub fn transform_ratio(records: &[RatioRecord]) -> Result<RatioTable> {
    let mut order: Vec<String> = Vec::new();
    let mut units: BTreeMap<String, (UnitInfo, [Option<f64>; N_YEARS])> = BTreeMap::new();

    for record in records {
        let year = year_index(record.an)?;
        let (_, ratios) = match units.entry(record.insee.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                order.push(record.insee.clone());
                let unit = UnitInfo {
                    siren_epci: record.insee.clone(),
                    nom_complet: record.nom.clone(),
                    forme_epci: record.forme.clone(),
                    population: record.pop,
                    commune_count: record.nbcom,
                };
                entry.insert((unit, [None; N_YEARS]))
            }
        };
        let slot = &mut ratios[year];
        *slot = Some(slot.unwrap_or(0.0) + record.ratioenr);
    }

    let total_population: u64 = units.values().map(|(unit, _)| unit.population).sum();

    let mut rows = Vec::with_capacity(order.len());
    for id in order {
        let (unit, ratios) = units
            .remove(&id)
            .ok_or_else(|| DataError::InvalidData(format!("Unit {} vanished while pivoting", id)))?;
        let pop_percentage = if total_population == 0 {
            0.0
        } else {
            round_to(unit.population as f64 / total_population as f64 * 100.0, 2)
        };
        rows.push(RatioRow {
            unit,
            ratios: ratios.map(|r| r.map(|v| round_to(v, 1))),
            pop_percentage,
        });
    }

    info!("Ratio table: {} units from {} records", rows.len(), records.len());
    Ok(RatioTable { rows })
}

/// Map labels, convert GWh to MWh (truncating) and pivot production records
pub fn transform_production(records: &[ProductionRecord]) -> Result<WideMetricTable> {
    let observations = records
        .iter()
        .map(|r| {
            Ok(CategoryObservation {
                unit_id: r.insee.clone(),
                year: r.an,
                source: EnergySource::from_label(&r.detail)?,
                value: (r.prod * 1000.0).trunc() as i64,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    pivot(Metric::Production, &observations)
}

/// Map labels, truncate to whole MWh and pivot consumption records
pub fn transform_consumption(records: &[ConsumptionRecord]) -> Result<WideMetricTable> {
    let observations = records
        .iter()
        .map(|r| {
            Ok(CategoryObservation {
                unit_id: r.insee.clone(),
                year: r.an,
                source: EnergySource::from_label(&r.categorie)?,
                value: r.consocvc.trunc() as i64,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    pivot(Metric::Consumption, &observations)
}

/// Sum observations into one row per unit
pub fn pivot(metric: Metric, observations: &[CategoryObservation]) -> Result<WideMetricTable> {
    let mut rows: BTreeMap<String, MetricRow> = BTreeMap::new();
    for obs in observations {
        let year = year_index(obs.year)?;
        rows.entry(obs.unit_id.clone())
            .or_default()
            .add(year, obs.source, obs.value);
    }

    debug!(
        "Pivoted {} {} observations into {} units",
        observations.len(),
        metric,
        rows.len()
    );
    Ok(WideMetricTable { metric, rows })
}

/// Round to `decimals` places, ties to even
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
