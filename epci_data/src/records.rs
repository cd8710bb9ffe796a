//! Raw long-format records as published in the open-data JSON exports

use crate::error::{DataError, Result};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One (unit, year) renewable-energy ratio observation with unit metadata
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RatioRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub insee: String,
    pub nom: String,
    pub forme: String,
    #[serde(deserialize_with = "count")]
    pub pop: u64,
    #[serde(deserialize_with = "count")]
    pub nbcom: u64,
    #[serde(deserialize_with = "year")]
    pub an: i32,
    pub ratioenr: f64,
}

/// Renewable production in GWh for one raw category label
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductionRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub insee: String,
    #[serde(deserialize_with = "year")]
    pub an: i32,
    pub detail: String,
    pub prod: f64,
}

/// Climate-corrected consumption in MWh for one category label
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsumptionRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub insee: String,
    #[serde(deserialize_with = "year")]
    pub an: i32,
    pub categorie: String,
    pub consocvc: f64,
}

/// Load a JSON array of records from `path`
pub fn load_records<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let records: Vec<T> = serde_json::from_reader(BufReader::new(file))?;
    tracing::debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Identifiers are published either as strings or as bare numbers
fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number identifier, got {}",
            other
        ))),
    }
}

fn year<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i32, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .and_then(|y| i32::try_from(y).ok())
            .ok_or_else(|| de::Error::custom(format!("invalid year {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid year '{}'", s))),
        other => Err(de::Error::custom(format!("invalid year {}", other))),
    }
}

/// Non-negative integral count, tolerating integral floats such as `1234.0`
fn count<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
        return Err(de::Error::custom(format!("invalid count {}", value)));
    }
    Ok(value as u64)
}

/// Normalize an identifier property for comparison
pub fn normalize_id(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(DataError::InvalidData(format!(
            "Unit identifier must be a string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ratio_record_accepts_numeric_ids() {
        let record: RatioRecord = serde_json::from_value(json!({
            "insee": 200066389, "nom": "CC X", "forme": "CC",
            "pop": 1500.0, "nbcom": 12, "an": "2021", "ratioenr": 22.45
        }))
        .unwrap();

        assert_eq!(record.insee, "200066389");
        assert_eq!(record.pop, 1500);
        assert_eq!(record.an, 2021);
    }

    #[test]
    fn test_fractional_population_is_rejected() {
        let result: std::result::Result<RatioRecord, _> = serde_json::from_value(json!({
            "insee": "A1", "nom": "X", "forme": "F",
            "pop": 10.5, "nbcom": 2, "an": 2019, "ratioenr": 1.0
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_padded_ids_match_normalized_ids() {
        let record: ProductionRecord = serde_json::from_value(json!({
            "insee": " 200066389 ", "an": 2020, "detail": "Eolien", "prod": 1.0
        }))
        .unwrap();

        assert_eq!(record.insee, "200066389");
        assert_eq!(record.insee, normalize_id(&json!(200066389)).unwrap());
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id(&json!(" 2000 ")).unwrap(), "2000");
        assert_eq!(normalize_id(&json!(2000)).unwrap(), "2000");
        assert!(normalize_id(&json!(null)).is_err());
    }
}
