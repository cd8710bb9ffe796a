//! Column names, years and categories of the consolidated EPCI table.
//! Every pivot column is generated from `YEARS` and `EnergySource::ALL`.

use crate::error::{DataError, Result};
use std::fmt;

/// Observed years, oldest first
pub const YEARS: [i32; 4] = [2019, 2020, 2021, 2022];
pub const N_YEARS: usize = YEARS.len();

/// Years produced by the recursive projection
pub const FORECAST_YEARS: [i32; 3] = [2023, 2024, 2025];

/// Position of `year` in `YEARS`
pub fn year_index(year: i32) -> Result<usize> {
    YEARS
        .iter()
        .position(|&y| y == year)
        .ok_or(DataError::UnknownYear(year))
}

// ── Unit columns ────────────────────────────────────────────────────────────
pub mod unit {
    pub const SIREN_EPCI: &str = "siren_epci";
    pub const NOM_COMPLET: &str = "nom_complet";
    pub const FORME_EPCI: &str = "forme_epci";
    pub const PMUN_EPCI: &str = "pmun_epci";
    pub const NB_COM_EPCI: &str = "nb_com_epci";
    pub const POP_PERCENTAGE: &str = "pop_percentage";
}

/// `ratioenr_{year}`
pub fn ratio_column(year: i32) -> String {
    format!("ratioenr_{}", year)
}

// ── Metrics ─────────────────────────────────────────────────────────────────

/// The two yearly quantities tracked per energy source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Production,
    Consumption,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Production, Metric::Consumption];

    /// Column prefix
    pub fn slug(self) -> &'static str {
        match self {
            Metric::Production => "prod",
            Metric::Consumption => "conso",
        }
    }

    /// `{metric}_{source}_{year}`
    pub fn category_column(self, source: EnergySource, year: i32) -> String {
        format!("{}_{}_{}", self.slug(), source.slug(), year)
    }

    /// `total_{metric}_{year}`
    pub fn total_column(self, year: i32) -> String {
        format!("total_{}_{}", self.slug(), year)
    }

    /// `per_capita_{metric}_{year}`
    pub fn per_capita_column(self, year: i32) -> String {
        format!("per_capita_{}_{}", self.slug(), year)
    }

    /// `pred_total_{metric}_{year}`
    pub fn prediction_column(self, year: i32) -> String {
        format!("pred_total_{}_{}", self.slug(), year)
    }

    /// Property injected into GeoJSON features for the terminal forecast year
    pub fn forecast_property(self, year: i32) -> String {
        format!("pred_{}_{}", self.slug(), year)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

// ── Energy sources ──────────────────────────────────────────────────────────

/// Canonical energy source every raw category label maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnergySource {
    Bio,
    Eolien,
    Geo,
    Hydro,
    Other,
    Solaire,
}

pub const N_SOURCES: usize = EnergySource::ALL.len();

impl EnergySource {
    /// Column order: alphabetical by slug
    pub const ALL: [EnergySource; 6] = [
        EnergySource::Bio,
        EnergySource::Eolien,
        EnergySource::Geo,
        EnergySource::Hydro,
        EnergySource::Other,
        EnergySource::Solaire,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            EnergySource::Bio => "bio",
            EnergySource::Eolien => "eolien",
            EnergySource::Geo => "geo",
            EnergySource::Hydro => "hydro",
            EnergySource::Other => "other",
            EnergySource::Solaire => "solaire",
        }
    }

    /// Position in `ALL`
    pub fn index(self) -> usize {
        self as usize
    }

    /// Map a raw dataset label (or an already canonical slug) to its source.
    ///
    /// The mapping is total over the known labels; anything else is an
    /// `UnmappedCategory` error.
    pub fn from_label(label: &str) -> Result<Self> {
        let source = match label {
            "Solaire photovoltaïque" | "Solaire thermique" | "solaire" => EnergySource::Solaire,
            "Production d'agrocarburants" | "Production de biocombustibles" | "Biogaz" | "bio" => {
                EnergySource::Bio
            }
            "Géothermie profonde basse énergie"
            | "Géothermie très haute énergie"
            | "PACs aérothermiques"
            | "PACs géothermiques"
            | "geo" => EnergySource::Geo,
            "Incinération déchets - part EnR" | "Filière bois-énergie" | "other" => {
                EnergySource::Other
            }
            "Eolien" | "eolien" => EnergySource::Eolien,
            "Hydraulique renouvelable" | "hydro" => EnergySource::Hydro,
            _ => return Err(DataError::UnmappedCategory(label.to_string())),
        };
        Ok(source)
    }
}

impl fmt::Display for EnergySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

// ── Merged table layout ─────────────────────────────────────────────────────

/// Storage type of a merged-table column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Int,
    Float,
}

/// Every column of the merged feature table, in output order
pub fn merged_columns() -> Vec<(String, ColumnKind)> {
    let mut columns = vec![
        (unit::SIREN_EPCI.to_string(), ColumnKind::Text),
        (unit::NOM_COMPLET.to_string(), ColumnKind::Text),
        (unit::FORME_EPCI.to_string(), ColumnKind::Text),
        (unit::PMUN_EPCI.to_string(), ColumnKind::Int),
        (unit::NB_COM_EPCI.to_string(), ColumnKind::Int),
    ];
    columns.extend(YEARS.iter().map(|&y| (ratio_column(y), ColumnKind::Float)));
    columns.push((unit::POP_PERCENTAGE.to_string(), ColumnKind::Float));

    for metric in Metric::ALL {
        for year in YEARS {
            for source in EnergySource::ALL {
                columns.push((metric.category_column(source, year), ColumnKind::Int));
            }
        }
        columns.extend(YEARS.iter().map(|&y| (metric.total_column(y), ColumnKind::Int)));
    }

    for year in YEARS {
        for metric in Metric::ALL {
            columns.push((metric.per_capita_column(year), ColumnKind::Int));
        }
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Solaire photovoltaïque", EnergySource::Solaire)]
    #[case("Solaire thermique", EnergySource::Solaire)]
    #[case("Biogaz", EnergySource::Bio)]
    #[case("PACs aérothermiques", EnergySource::Geo)]
    #[case("Filière bois-énergie", EnergySource::Other)]
    #[case("Eolien", EnergySource::Eolien)]
    #[case("Hydraulique renouvelable", EnergySource::Hydro)]
    #[case("hydro", EnergySource::Hydro)]
    fn test_label_mapping(#[case] label: &str, #[case] expected: EnergySource) {
        assert_eq!(EnergySource::from_label(label).unwrap(), expected);
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        match EnergySource::from_label("Nucléaire") {
            Err(DataError::UnmappedCategory(label)) => assert_eq!(label, "Nucléaire"),
            other => panic!("Expected UnmappedCategory, got {:?}", other),
        }
        // Case matters
        assert!(EnergySource::from_label("eolien ").is_err());
    }

    #[test]
    fn test_index_matches_all() {
        for (i, source) in EnergySource::ALL.iter().enumerate() {
            assert_eq!(source.index(), i);
        }
    }

    #[test]
    fn test_column_names() {
        assert_eq!(
            Metric::Production.category_column(EnergySource::Eolien, 2021),
            "prod_eolien_2021"
        );
        assert_eq!(Metric::Consumption.total_column(2022), "total_conso_2022");
        assert_eq!(Metric::Production.per_capita_column(2019), "per_capita_prod_2019");
        assert_eq!(Metric::Consumption.prediction_column(2025), "pred_total_conso_2025");
        assert_eq!(Metric::Production.forecast_property(2025), "pred_prod_2025");
    }

    #[test]
    fn test_merged_columns_are_unique() {
        let columns = merged_columns();
        let mut names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        // 5 unit + 4 ratio + share + 2 * (24 + 4) metric + 8 per-capita
        assert_eq!(total, 74);
        assert_eq!(columns[0].0, unit::SIREN_EPCI);
    }

    #[test]
    fn test_year_index() {
        assert_eq!(year_index(2019).unwrap(), 0);
        assert_eq!(year_index(2022).unwrap(), 3);
        assert!(matches!(year_index(2018), Err(DataError::UnknownYear(2018))));
    }
}
