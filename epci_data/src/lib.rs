//! # EPCI Data
//!
//! `epci_data` consolidates three yearly open-data exports about French
//! inter-municipal groupings (EPCI) into one feature table, and enriches the
//! EPCI boundary GeoJSON with it.
//!
//! ## Pipeline
//!
//! - **Transform**: ratio, production and consumption records are pivoted
//!   into wide per-unit tables ([`transform`])
//! - **Merge**: the three tables are left-joined on the ratio base and
//!   per-capita values are derived ([`merge`])
//! - **Geometry enrichment**: coordinates are rounded to 3 decimals and the
//!   merged columns are written into each feature's properties ([`geo`])
//!
//! ## Usage Example
//!
//! ```no_run
//! use epci_data::{io, load_records, merge, transform};
//! use epci_data::records::{ConsumptionRecord, ProductionRecord, RatioRecord};
//!
//! let ratio = transform::transform_ratio(&load_records::<RatioRecord, _>("ratio.json")?)?;
//! let prod = transform::transform_production(&load_records::<ProductionRecord, _>("prod.json")?)?;
//! let conso_records = load_records::<ConsumptionRecord, _>("conso.json")?;
//! let conso = transform::transform_consumption(&conso_records)?;
//!
//! let merged = merge::merge(&ratio, &prod, &conso)?;
//! let mut frame = io::merged_to_frame(&merged)?;
//! io::write_csv(&mut frame, "processed_data_no_ml.csv")?;
//! # Ok::<(), epci_data::DataError>(())
//! ```

pub mod error;
pub mod geo;
pub mod io;
pub mod merge;
pub mod records;
pub mod schema;
pub mod transform;

// Re-export commonly used types
pub use crate::error::{DataError, Result};
pub use crate::geo::{enrich_features, Feature, FeatureCollection};
pub use crate::merge::{ColumnValue, MergedRow, MergedTable};
pub use crate::records::load_records;
pub use crate::schema::{EnergySource, Metric};
