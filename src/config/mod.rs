//! Configuration module for the model pipeline.
//!
//! Settings are read from the environment (after `dotenvy` has loaded a local
//! `.env`), validated once, and handed to each stage explicitly.

mod store_config;

pub use store_config::{KEY_VAR, StoreConfig, URL_VAR};

use crate::domain::errors::ConfigError;
use std::path::{Path, PathBuf};

pub const MODEL_FILE: &str = "current_model.onnx";
pub const METRICS_FILE: &str = "model_metrics.json";
pub const DUMP_FILE: &str = "training_data_dump.csv";

/// Local files used to hand results from one stage to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub metrics: PathBuf,
    pub dump: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(MODEL_FILE),
            metrics: dir.join(METRICS_FILE),
            dump: dir.join(DUMP_FILE),
        }
    }
}

impl Default for ArtifactPaths {
    /// Files in the working directory.
    fn default() -> Self {
        Self {
            model: PathBuf::from(MODEL_FILE),
            metrics: PathBuf::from(METRICS_FILE),
            dump: PathBuf::from(DUMP_FILE),
        }
    }
}

/// Main pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub artifacts: ArtifactPaths,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: StoreConfig::from_env()?,
            artifacts: ArtifactPaths::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths_in_dir() {
        let paths = ArtifactPaths::in_dir("/tmp/run");
        assert_eq!(paths.model, PathBuf::from("/tmp/run/current_model.onnx"));
        assert_eq!(paths.metrics, PathBuf::from("/tmp/run/model_metrics.json"));
        assert_eq!(paths.dump, PathBuf::from("/tmp/run/training_data_dump.csv"));
    }

    #[test]
    fn test_default_paths_are_relative() {
        let paths = ArtifactPaths::default();
        assert!(paths.model.is_relative());
        assert_eq!(paths.model, PathBuf::from(MODEL_FILE));
    }
}
