//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::logic::model::{ForestParams, TrainingConfig};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Root for uploaded datasets and their index
    pub data_dir: PathBuf,

    /// Upload size cap in megabytes
    pub max_upload_mb: u64,

    /// Hard cap on rows replayed per dataset analysis call
    pub dataset_row_limit: usize,

    /// Classifier training
    pub training: TrainingConfig,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://reports.db".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5001,
            data_dir: PathBuf::from("./data"),
            max_upload_mb: 200,
            dataset_row_limit: 1000,
            training: TrainingConfig::default(),
            environment: "development".to_string(),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let forest_defaults = ForestParams::default();

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),

            host: env::var("HOST").unwrap_or(defaults.host),

            port: parsed("PORT").unwrap_or(defaults.port),

            data_dir: env::var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),

            max_upload_mb: parsed("MAX_UPLOAD_MB").unwrap_or(defaults.max_upload_mb),

            dataset_row_limit: parsed("DATASET_ROW_LIMIT").unwrap_or(defaults.dataset_row_limit),

            training: TrainingConfig {
                samples: parsed("TRAINING_SAMPLES").unwrap_or(defaults.training.samples),
                forest: ForestParams {
                    n_trees: parsed("FOREST_TREES").unwrap_or(forest_defaults.n_trees),
                    max_depth: parsed("FOREST_MAX_DEPTH").unwrap_or(forest_defaults.max_depth),
                    seed: parsed("MODEL_SEED").unwrap_or(forest_defaults.seed),
                    ..forest_defaults
                },
            },

            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Upload cap in bytes
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn dataset_index_path(&self) -> PathBuf {
        self.data_dir.join("datasets.json")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
