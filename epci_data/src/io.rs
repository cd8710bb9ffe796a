//! File boundary: merged-table CSV and GeoJSON
//!
//! The merged table goes through a polars `DataFrame` on its way to and from
//! CSV. Output targets are chosen by file extension; anything else is refused
//! before a file is created.

use crate::error::{DataError, Result};
use crate::geo::FeatureCollection;
use crate::merge::{ColumnValue, MergedRow, MergedTable};
use crate::schema::{
    merged_columns, ratio_column, unit, ColumnKind, EnergySource, Metric, N_SOURCES, N_YEARS, YEARS,
};
use crate::transform::{MetricRow, UnitInfo};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Formats the pipeline can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    GeoJson,
}

impl OutputFormat {
    /// Format named by the extension of `path`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => Ok(OutputFormat::Csv),
            Some("geojson") | Some("json") => Ok(OutputFormat::GeoJson),
            _ => Err(DataError::UnsupportedOutput(path.display().to_string())),
        }
    }
}

fn expect_format(path: &Path, expected: OutputFormat) -> Result<()> {
    let format = OutputFormat::from_path(path)?;
    if format != expected {
        return Err(DataError::UnsupportedOutput(format!(
            "{} is a {:?} target, expected {:?}",
            path.display(),
            format,
            expected
        )));
    }
    Ok(())
}

/// Build a typed series from cells of one column
pub fn column_series(name: &str, kind: ColumnKind, cells: &[ColumnValue]) -> Result<Series> {
    let mismatch = |cell: &ColumnValue| {
        DataError::InvalidData(format!("Column {} expects {:?}, got {:?}", name, kind, cell))
    };
    let series = match kind {
        ColumnKind::Text => Series::new(
            name,
            cells
                .iter()
                .map(|c| match c {
                    ColumnValue::Text(s) => Ok(s.clone()),
                    other => Err(mismatch(other)),
                })
                .collect::<Result<Vec<String>>>()?,
        ),
        ColumnKind::Int => Series::new(
            name,
            cells
                .iter()
                .map(|c| match c {
                    ColumnValue::Int(v) => Ok(*v),
                    other => Err(mismatch(other)),
                })
                .collect::<Result<Vec<i64>>>()?,
        ),
        ColumnKind::Float => Series::new(
            name,
            cells
                .iter()
                .map(|c| c.as_f64().ok_or_else(|| mismatch(c)))
                .collect::<Result<Vec<f64>>>()?,
        ),
    };
    Ok(series)
}

/// The merged table as a data frame with the `merged_columns` layout
pub fn merged_to_frame(table: &MergedTable) -> Result<DataFrame> {
    let rows: Vec<Vec<ColumnValue>> = table.rows().iter().map(MergedRow::cells).collect();
    let columns = merged_columns()
        .iter()
        .enumerate()
        .map(|(i, (name, kind))| {
            let cells: Vec<ColumnValue> = rows.iter().map(|r| r[i].clone()).collect();
            column_series(name, *kind, &cells)
        })
        .collect::<Result<Vec<Series>>>()?;

    Ok(DataFrame::new(columns)?)
}

/// Write a data frame as comma-separated text with a header row
pub fn write_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    expect_format(path, OutputFormat::Csv)?;

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Load a data frame from a CSV file with a header row
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let file = File::open(path)?;
    let df = CsvReader::new(file)
        .infer_schema(None)
        .has_header(true)
        .finish()?;
    Ok(df)
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = column(df, name)?.cast(&DataType::Utf8)?;
    series
        .utf8()?
        .into_iter()
        .map(|v| v.map(str::to_owned).ok_or_else(|| null_in(name)))
        .collect()
}

fn int_column(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let series = column(df, name)?.cast(&DataType::Int64)?;
    series
        .i64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| null_in(name)))
        .collect()
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = column(df, name)?.cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| null_in(name)))
        .collect()
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map_err(|_| DataError::MissingColumn(name.to_string()))
}

fn null_in(name: &str) -> DataError {
    DataError::InvalidData(format!("Null value in column {}", name))
}

fn non_negative(value: i64, name: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| DataError::InvalidData(format!("Negative value {} in column {}", value, name)))
}

/// Rebuild the merged table from a frame written by `merged_to_frame`.
///
/// Extra columns are ignored. Totals are checked against their categories.
pub fn frame_to_merged(df: &DataFrame) -> Result<MergedTable> {
    let ids = text_column(df, unit::SIREN_EPCI)?;
    let names = text_column(df, unit::NOM_COMPLET)?;
    let formes = text_column(df, unit::FORME_EPCI)?;
    let populations = int_column(df, unit::PMUN_EPCI)?;
    let communes = int_column(df, unit::NB_COM_EPCI)?;
    let shares = float_column(df, unit::POP_PERCENTAGE)?;
    let ratios = YEARS
        .iter()
        .map(|&y| float_column(df, &ratio_column(y)))
        .collect::<Result<Vec<_>>>()?;

    // [metric][year][source] and [metric][year]
    let mut values = Vec::new();
    let mut totals = Vec::new();
    let mut per_capita = Vec::new();
    for metric in Metric::ALL {
        let mut by_year = Vec::new();
        for year in YEARS {
            by_year.push(
                EnergySource::ALL
                    .iter()
                    .map(|&s| int_column(df, &metric.category_column(s, year)))
                    .collect::<Result<Vec<_>>>()?,
            );
        }
        values.push(by_year);
        totals.push(
            YEARS
                .iter()
                .map(|&y| int_column(df, &metric.total_column(y)))
                .collect::<Result<Vec<_>>>()?,
        );
        per_capita.push(
            YEARS
                .iter()
                .map(|&y| int_column(df, &metric.per_capita_column(y)))
                .collect::<Result<Vec<_>>>()?,
        );
    }

    let mut rows = Vec::with_capacity(df.height());
    for r in 0..df.height() {
        let mut metric_rows = [MetricRow::default(); 2];
        let mut per_capita_row = [[0i64; N_YEARS]; 2];
        for (m, metric) in Metric::ALL.iter().enumerate() {
            let mut grid = [[0i64; N_SOURCES]; N_YEARS];
            for (y, year_values) in grid.iter_mut().enumerate() {
                for (s, value) in year_values.iter_mut().enumerate() {
                    *value = values[m][y][s][r];
                }
            }
            let row = MetricRow::from_values(grid);
            for (y, &year) in YEARS.iter().enumerate() {
                if row.total(y) != totals[m][y][r] {
                    return Err(DataError::InvalidData(format!(
                        "{} is {} for unit {} but its categories sum to {}",
                        metric.total_column(year),
                        totals[m][y][r],
                        ids[r],
                        row.total(y)
                    )));
                }
                per_capita_row[m][y] = per_capita[m][y][r];
            }
            metric_rows[m] = row;
        }

        let mut ratio_row = [0.0; N_YEARS];
        for (y, ratio) in ratio_row.iter_mut().enumerate() {
            *ratio = ratios[y][r];
        }

        rows.push(MergedRow {
            unit: UnitInfo {
                siren_epci: ids[r].clone(),
                nom_complet: names[r].clone(),
                forme_epci: formes[r].clone(),
                population: non_negative(populations[r], unit::PMUN_EPCI)?,
                commune_count: non_negative(communes[r], unit::NB_COM_EPCI)?,
            },
            ratios: ratio_row,
            pop_percentage: shares[r],
            production: metric_rows[0],
            consumption: metric_rows[1],
            per_capita: per_capita_row,
        });
    }

    MergedTable::from_rows(rows)
}

/// Read a merged table back from CSV
pub fn read_merged_csv<P: AsRef<Path>>(path: P) -> Result<MergedTable> {
    let path = path.as_ref();
    let table = frame_to_merged(&read_csv(path)?)?;
    info!("Read {} units from {}", table.len(), path.display());
    Ok(table)
}

/// Load a GeoJSON FeatureCollection
pub fn read_feature_collection<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write a GeoJSON FeatureCollection
pub fn write_feature_collection<P: AsRef<Path>>(
    collection: &FeatureCollection,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    expect_format(path, OutputFormat::GeoJson)?;

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, collection)?;
    writer.flush()?;
    info!(
        "Wrote {} features to {}",
        collection.features.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("out/processed.csv", OutputFormat::Csv)]
    #[case("epci.geojson", OutputFormat::GeoJson)]
    #[case("EPCI.JSON", OutputFormat::GeoJson)]
    fn test_format_from_extension(#[case] path: &str, #[case] expected: OutputFormat) {
        assert_eq!(OutputFormat::from_path(path).unwrap(), expected);
    }

    #[rstest]
    #[case("table.parquet")]
    #[case("no_extension")]
    fn test_unsupported_targets(#[case] path: &str) {
        assert!(matches!(
            OutputFormat::from_path(path),
            Err(DataError::UnsupportedOutput(_))
        ));
    }

    #[test]
    fn test_wrong_format_refused_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.geojson");
        let mut df = DataFrame::new(vec![Series::new("a", vec![1i64])]).unwrap();

        assert!(write_csv(&mut df, &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_column_series_kind_mismatch() {
        let cells = vec![ColumnValue::Int(1), ColumnValue::Text("x".to_string())];
        assert!(column_series("c", ColumnKind::Int, &cells).is_err());
        // Integers are accepted where floats are expected
        assert!(column_series("c", ColumnKind::Float, &cells[..1]).is_ok());
    }
}
