use approx::assert_relative_eq;
use epci_data::merge::{merge, per_capita};
use epci_data::records::{ConsumptionRecord, ProductionRecord, RatioRecord};
use epci_data::schema::{year_index, EnergySource, Metric, YEARS};
use epci_data::transform::{transform_consumption, transform_production, transform_ratio};
use epci_data::{ColumnValue, MergedTable};

fn ratio_records(insee: &str, pop: u64, start: f64) -> Vec<RatioRecord> {
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
            ratioenr: start + i as f64,
        })
        .collect()
}

fn prod(insee: &str, an: i32, detail: &str, value: f64) -> ProductionRecord {
    ProductionRecord {
        insee: insee.to_string(),
        an,
        detail: detail.to_string(),
        prod: value,
    }
}

fn conso(insee: &str, an: i32, categorie: &str, value: f64) -> ConsumptionRecord {
    ConsumptionRecord {
        insee: insee.to_string(),
        an,
        categorie: categorie.to_string(),
        consocvc: value,
    }
}

fn cell(table: &MergedTable, id: &str, column: &str) -> ColumnValue {
    let position = MergedTable::column_names()
        .iter()
        .position(|c| c == column)
        .unwrap_or_else(|| panic!("no column {}", column));
    table.get(id).unwrap().cells()[position].clone()
}

#[test]
fn test_unit_without_metrics_is_zero_filled() {
    let ratio = transform_ratio(&ratio_records("A1", 100, 10.0)).unwrap();
    let production = transform_production(&[]).unwrap();
    let consumption = transform_consumption(&[]).unwrap();

    let merged = merge(&ratio, &production, &consumption).unwrap();

    assert_eq!(merged.len(), 1);
    assert_eq!(cell(&merged, "A1", "ratioenr_2022"), ColumnValue::Float(13.0));
    assert_eq!(cell(&merged, "A1", "total_prod_2022"), ColumnValue::Int(0));
    assert_eq!(cell(&merged, "A1", "per_capita_prod_2022"), ColumnValue::Int(0));
    assert_eq!(cell(&merged, "A1", "conso_bio_2019"), ColumnValue::Int(0));
}

#[test]
fn test_wind_production_in_mwh() {
    let ratio = transform_ratio(&ratio_records("A1", 100, 10.0)).unwrap();
    let production = transform_production(&[prod("A1", 2021, "Eolien", 2.0)]).unwrap();
    let consumption = transform_consumption(&[]).unwrap();

    let merged = merge(&ratio, &production, &consumption).unwrap();

    assert_eq!(cell(&merged, "A1", "prod_eolien_2021"), ColumnValue::Int(2000));
    assert_eq!(cell(&merged, "A1", "total_prod_2021"), ColumnValue::Int(2000));
    assert_eq!(cell(&merged, "A1", "per_capita_prod_2021"), ColumnValue::Int(20));
}

#[test]
fn test_row_count_follows_ratio_base() {
    let mut records = ratio_records("A1", 100, 10.0);
    records.extend(ratio_records("B2", 300, 20.0));
    records.extend(ratio_records("C3", 600, 30.0));
    let ratio = transform_ratio(&records).unwrap();

    // "Z9" has production but no ratio row: it is dropped by the left join
    let production = transform_production(&[
        prod("A1", 2019, "Biogaz", 1.0),
        prod("Z9", 2019, "Biogaz", 1.0),
    ])
    .unwrap();
    let consumption = transform_consumption(&[conso("B2", 2020, "solaire", 10.0)]).unwrap();

    let merged = merge(&ratio, &production, &consumption).unwrap();

    assert_eq!(merged.len(), ratio.len());
    assert!(merged.get("Z9").is_none());
    let ids: Vec<&str> = merged.rows().iter().map(|r| r.unit.siren_epci.as_str()).collect();
    assert_eq!(ids, vec!["A1", "B2", "C3"]);
    assert_relative_eq!(merged.get("C3").unwrap().pop_percentage, 60.0);
}

#[test]
fn test_totals_are_sums_of_categories() {
    let ratio = transform_ratio(&ratio_records("A1", 7, 1.0)).unwrap();
    let production = transform_production(&[
        prod("A1", 2020, "Eolien", 1.5),
        prod("A1", 2020, "Solaire photovoltaïque", 0.25),
        prod("A1", 2020, "Solaire thermique", 0.125),
        prod("A1", 2020, "Filière bois-énergie", 3.0),
        prod("A1", 2022, "Hydraulique renouvelable", 9.999),
    ])
    .unwrap();
    let consumption = transform_consumption(&[
        conso("A1", 2020, "geo", 12.7),
        conso("A1", 2020, "hydro", 3.3),
    ])
    .unwrap();

    let merged = merge(&ratio, &production, &consumption).unwrap();
    let row = merged.get("A1").unwrap();

    for metric in Metric::ALL {
        for year in 0..YEARS.len() {
            let sum: i64 = EnergySource::ALL
                .iter()
                .map(|&s| row.metric(metric).value(year, s))
                .sum();
            assert_eq!(row.metric(metric).total(year), sum);
        }
    }

    let y2020 = year_index(2020).unwrap();
    assert_eq!(row.production.total(y2020), 1500 + 250 + 125 + 3000);
    assert_eq!(row.consumption.total(y2020), 15);
    assert_eq!(row.production.total(year_index(2022).unwrap()), 9999);
}

#[test]
fn test_per_capita_recovers_total() {
    for (total, population) in [(4875_i64, 7_u64), (1, 3), (123_456_789, 48_213)] {
        let value = per_capita(total, population);
        assert_relative_eq!(value * population as f64, total as f64, max_relative = 1e-12);
    }
}

#[test]
fn test_per_capita_is_truncated() {
    let ratio = transform_ratio(&ratio_records("A1", 7, 1.0)).unwrap();
    let production = transform_production(&[prod("A1", 2019, "Eolien", 0.02)]).unwrap();
    let merged = merge(&ratio, &production, &transform_consumption(&[]).unwrap()).unwrap();

    // 20 / 7 = 2.857...
    assert_eq!(merged.get("A1").unwrap().per_capita(Metric::Production, 0), 2);
}
