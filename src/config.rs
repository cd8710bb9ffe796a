//! Pipeline configuration

use energy_math::{ForestParams, TreeParams};
use epci_forecast::TrainerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const RATIO_FILE: &str = "ratio.json";
pub const PRODUCTION_FILE: &str = "prod.json";
pub const CONSUMPTION_FILE: &str = "conso.json";
pub const BOUNDARIES_FILE: &str = "epci.geojson";

pub const MERGED_CSV: &str = "processed_data_no_ml.csv";
pub const MERGED_GEOJSON: &str = "epci_no_ml.geojson";
pub const FORECAST_CSV: &str = "processed_data_ml.csv";
pub const FORECAST_GEOJSON: &str = "epci_ml.geojson";

/// Where the pipeline reads and writes, and how it trains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the three JSON exports and the boundary GeoJSON
    pub dataset_dir: PathBuf,
    /// Directory receiving every output file
    pub output_dir: PathBuf,
    pub trees: usize,
    pub max_depth: usize,
    pub seed: u64,
    pub test_size: f64,
    pub cv_folds: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let trainer = TrainerConfig::default();
        Self {
            dataset_dir: PathBuf::from("original_dataset"),
            output_dir: PathBuf::from("processed_data"),
            trees: trainer.forest.n_trees,
            max_depth: trainer.forest.tree.max_depth,
            seed: trainer.forest.seed,
            test_size: trainer.test_size,
            cv_folds: trainer.cv_folds,
        }
    }
}

impl PipelineConfig {
    pub fn dataset_file(&self, name: &str) -> PathBuf {
        self.dataset_dir.join(name)
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Trainer settings for both metrics
    pub fn trainer(&self) -> TrainerConfig {
        let defaults = TrainerConfig::default();
        TrainerConfig {
            forest: ForestParams {
                n_trees: self.trees,
                tree: TreeParams {
                    max_depth: self.max_depth,
                    ..defaults.forest.tree
                },
                seed: self.seed,
            },
            test_size: self.test_size,
            cv_folds: self.cv_folds,
            ..defaults
        }
    }
}
