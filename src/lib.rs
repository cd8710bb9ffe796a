//! # EPCI Energy
//!
//! `epci_energy` turns the yearly renewable-energy exports of French
//! inter-municipal groupings into a consolidated table, boundary GeoJSON
//! enriched with it, and a three-year projection of production and
//! consumption totals.
//!
//! ## Example
//!
//! ```no_run
//! use epci_energy::{pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let predictions = pipeline::run(&config)?;
//! println!("{} units projected", predictions.len());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod pipeline;

pub use crate::config::PipelineConfig;
pub use crate::pipeline::{forecast, process, run, Consolidated};
