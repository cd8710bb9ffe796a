use epci_energy::config::{FORECAST_CSV, FORECAST_GEOJSON, MERGED_CSV, MERGED_GEOJSON};
use epci_energy::{forecast, process, run, PipelineConfig};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const UNITS: usize = 12;

fn unit_id(u: usize) -> String {
    format!("2000000{:02}", u)
}

/// Write the four input files for `UNITS` units under `dir`
fn write_dataset(dir: &Path) {
    let years = [2019, 2020, 2021, 2022];
    let mut ratio = Vec::new();
    let mut prod = Vec::new();
    let mut conso = Vec::new();
    let mut features = Vec::new();

    for u in 0..UNITS {
        for (i, year) in years.iter().enumerate() {
            ratio.push(json!({
                "insee": unit_id(u), "nom": format!("EPCI {}", u),
                "forme": if u % 2 == 0 { "CC" } else { "CA" },
                "pop": 1000 + u * 100, "nbcom": 4, "an": year, "ratioenr": 10.0 + i as f64
            }));
            prod.push(json!({
                "insee": unit_id(u), "an": year.to_string(), "detail": "Solaire photovoltaïque",
                "prod": (u + 1) as f64 * (1.0 + 0.2 * i as f64)
            }));
            conso.push(json!({
                "insee": unit_id(u), "an": year, "categorie": "Biogaz",
                "consocvc": 100.0 * (u + 1) as f64 + 5.0 * i as f64
            }));
        }
        features.push(json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[2.123456, 48.98765], [2.5, 48.1], [2.123456, 48.98765]]]
            },
            "properties": {"siren_epci": unit_id(u)}
        }));
    }
    // A boundary without data
    features.push(json!({
        "type": "Feature",
        "geometry": null,
        "properties": {"siren_epci": "999999999"}
    }));

    fs::write(dir.join("ratio.json"), Value::from(ratio).to_string()).unwrap();
    fs::write(dir.join("prod.json"), Value::from(prod).to_string()).unwrap();
    fs::write(dir.join("conso.json"), Value::from(conso).to_string()).unwrap();
    let collection = json!({"type": "FeatureCollection", "features": features});
    fs::write(dir.join("epci.geojson"), collection.to_string()).unwrap();
}

fn config(root: &Path) -> PipelineConfig {
    let dataset_dir = root.join("original_dataset");
    fs::create_dir_all(&dataset_dir).unwrap();
    write_dataset(&dataset_dir);
    PipelineConfig {
        dataset_dir,
        output_dir: root.join("processed_data"),
        trees: 5,
        max_depth: 3,
        ..Default::default()
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_process_writes_consolidated_outputs() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());

    let consolidated = process(&config).unwrap();
    assert_eq!(consolidated.table.len(), UNITS);

    let csv = fs::read_to_string(config.output_file(MERGED_CSV)).unwrap();
    assert_eq!(csv.lines().count(), UNITS + 1);

    let geojson = read_json(&config.output_file(MERGED_GEOJSON));
    let features = geojson["features"].as_array().unwrap();
    assert_eq!(features.len(), UNITS + 1);
    assert_eq!(features[0]["properties"]["prod_solaire_2019"], json!(1000));
    assert_eq!(
        features[0]["geometry"]["coordinates"][0][0],
        json!([2.123, 48.988])
    );
    assert!(features[UNITS]["properties"].get("ratioenr_2019").is_none());
}

#[test]
fn test_forecast_reads_process_outputs() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    process(&config).unwrap();

    let predictions = forecast(&config).unwrap();
    assert_eq!(predictions.len(), UNITS);

    let csv = fs::read_to_string(config.output_file(FORECAST_CSV)).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.ends_with("pred_total_prod_2024,pred_total_prod_2025"));

    let geojson = read_json(&config.output_file(FORECAST_GEOJSON));
    let features = geojson["features"].as_array().unwrap();
    assert_eq!(features.len(), UNITS + 1);
    let first = predictions.get(&unit_id(0)).unwrap();
    assert_eq!(features[0]["properties"]["pred_prod_2025"], json!(first.production[3]));
    assert_eq!(features[0]["properties"]["pred_conso_2025"], json!(first.consumption[3]));
    assert!(features[UNITS]["properties"].get("pred_prod_2025").is_none());
}

#[test]
fn test_run_matches_two_stage_forecast() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());

    let in_memory = run(&config).unwrap();
    let from_files = forecast(&config).unwrap();
    assert_eq!(in_memory.rows(), from_files.rows());
}

#[test]
fn test_missing_dataset_fails() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig {
        dataset_dir: dir.path().join("absent"),
        output_dir: dir.path().join("out"),
        ..Default::default()
    };
    let err = process(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("ratio.json"));
}
