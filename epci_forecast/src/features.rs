//! Feature matrix for the yearly total regressors

use crate::error::{ForecastError, Result};
use epci_data::schema::{unit, year_index};
use epci_data::{MergedTable, Metric};
use std::collections::BTreeSet;
use tracing::debug;

/// Dense numeric features, one row per merged-table unit
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build the features used to learn totals of `target_year`.
    ///
    /// Identifier and name columns are dropped, as is every column whose name
    /// mentions the target year. The legal form is one-hot encoded with one
    /// column per distinct value, in sorted order, after the numeric columns.
    pub fn from_table(table: &MergedTable, target_year: i32) -> Result<Self> {
        let year = target_year.to_string();
        let names = MergedTable::column_names();
        let kept: Vec<usize> = names
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                !matches!(name.as_str(), unit::SIREN_EPCI | unit::NOM_COMPLET | unit::FORME_EPCI)
                    && !name.contains(&year)
            })
            .map(|(i, _)| i)
            .collect();

        let forms: BTreeSet<&str> = table
            .rows()
            .iter()
            .map(|r| r.unit.forme_epci.as_str())
            .collect();

        let mut columns: Vec<String> = kept.iter().map(|&i| names[i].clone()).collect();
        columns.extend(forms.iter().map(|f| f.to_string()));

        let mut rows = Vec::with_capacity(table.len());
        for row in table.rows() {
            let cells = row.cells();
            let mut features = Vec::with_capacity(columns.len());
            for &i in &kept {
                let value = cells[i].as_f64().ok_or_else(|| {
                    ForecastError::Config(format!("Feature column {} is not numeric", names[i]))
                })?;
                features.push(value);
            }
            features.extend(
                forms
                    .iter()
                    .map(|f| if *f == row.unit.forme_epci { 1.0 } else { 0.0 }),
            );
            rows.push(features);
        }

        debug!(
            "Feature matrix for {}: {} rows x {} columns ({} legal forms)",
            target_year,
            rows.len(),
            columns.len(),
            forms.len()
        );
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of feature columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Position of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Positions of the three `total_{metric}_{year}` columns preceding the
/// target year, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagColumns {
    indices: [usize; 3],
}

impl LagColumns {
    pub fn resolve(features: &FeatureMatrix, metric: Metric, target_year: i32) -> Result<Self> {
        let mut indices = [0usize; 3];
        for (slot, index) in indices.iter_mut().enumerate() {
            let name = metric.total_column(target_year - 3 + slot as i32);
            *index = features
                .column_index(&name)
                .ok_or_else(|| ForecastError::Config(format!("Missing lag column {}", name)))?;
        }
        Ok(Self { indices })
    }

    pub fn indices(&self) -> [usize; 3] {
        self.indices
    }
}

/// Observed `total_{metric}_{year}` of every unit, in table order
pub fn metric_totals(table: &MergedTable, metric: Metric, year: i32) -> Result<Vec<f64>> {
    let index = year_index(year).map_err(|_| {
        ForecastError::Config(format!(
            "Missing target column {}",
            metric.total_column(year)
        ))
    })?;
    Ok(table
        .rows()
        .iter()
        .map(|r| r.metric(metric).total(index) as f64)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use epci_data::merge::merge;
    use epci_data::records::RatioRecord;
    use epci_data::transform::{pivot, transform_ratio};

    fn table(forms: &[(&str, &str)]) -> MergedTable {
        let records: Vec<RatioRecord> = forms
            .iter()
            .map(|(id, forme)| RatioRecord {
                insee: id.to_string(),
                nom: format!("Unit {}", id),
                forme: forme.to_string(),
                pop: 100,
                nbcom: 3,
                an: 2021,
                ratioenr: 4.0,
            })
            .collect();
        let ratio = transform_ratio(&records).unwrap();
        merge(
            &ratio,
            &pivot(Metric::Production, &[]).unwrap(),
            &pivot(Metric::Consumption, &[]).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_target_year_columns_are_excluded() {
        let features = FeatureMatrix::from_table(&table(&[("A1", "CC")]), 2022).unwrap();

        assert!(features.columns().iter().all(|c| !c.contains("2022")));
        assert!(features.column_index("siren_epci").is_none());
        assert!(features.column_index("nom_complet").is_none());
        assert!(features.column_index("forme_epci").is_none());
        assert!(features.column_index("total_prod_2021").is_some());
        assert!(features.column_index("pop_percentage").is_some());
        assert_eq!(features.width(), features.rows()[0].len());
    }

    #[test]
    fn test_legal_form_is_one_hot_encoded() {
        let units = table(&[("A1", "CC"), ("B2", "CA"), ("C3", "CC")]);
        let features = FeatureMatrix::from_table(&units, 2022).unwrap();

        let ca = features.column_index("CA").unwrap();
        let cc = features.column_index("CC").unwrap();
        assert_eq!(cc, ca + 1);
        assert_eq!(cc, features.width() - 1);

        let encoded: Vec<(f64, f64)> = features.rows().iter().map(|r| (r[ca], r[cc])).collect();
        assert_eq!(encoded, vec![(0.0, 1.0), (1.0, 0.0), (0.0, 1.0)]);
    }

    #[test]
    fn test_lag_columns() {
        let features = FeatureMatrix::from_table(&table(&[("A1", "CC")]), 2022).unwrap();
        let lags = LagColumns::resolve(&features, Metric::Consumption, 2022).unwrap();
        let names: Vec<&str> = lags
            .indices()
            .iter()
            .map(|&i| features.columns()[i].as_str())
            .collect();
        assert_eq!(names, vec!["total_conso_2019", "total_conso_2020", "total_conso_2021"]);

        // 2021 as target drops total_prod_2021 from the features
        let features = FeatureMatrix::from_table(&table(&[("A1", "CC")]), 2021).unwrap();
        assert!(matches!(
            LagColumns::resolve(&features, Metric::Production, 2022),
            Err(ForecastError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_target_year() {
        let t = table(&[("A1", "CC")]);
        assert!(matches!(
            metric_totals(&t, Metric::Production, 2030),
            Err(ForecastError::Config(_))
        ));
        let totals = metric_totals(&t, Metric::Production, 2022).unwrap();
        assert_eq!(totals, vec![0.0]);
    }
}
