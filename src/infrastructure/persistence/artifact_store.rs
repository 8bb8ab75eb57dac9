use crate::config::ArtifactPaths;
use crate::domain::ml::metrics::ClassificationMetrics;
use crate::domain::ml::training_record::{TrainingDataset, flattened_columns};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

/// Local files that carry the trained model from the trainer to the uploader.
pub struct ArtifactStore {
    paths: ArtifactPaths,
}

impl ArtifactStore {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn save_model(&self, bytes: &[u8]) -> Result<()> {
        ensure_parent(&self.paths.model)?;
        fs::write(&self.paths.model, bytes)
            .with_context(|| format!("Failed to write model to {:?}", self.paths.model))?;
        info!("Saved model to {:?} ({} bytes)", self.paths.model, bytes.len());
        Ok(())
    }

    /// `Ok(None)` when the model file does not exist.
    pub fn load_model(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.paths.model) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read model from {:?}", self.paths.model))
            }
        }
    }

    pub fn save_metrics(&self, metrics: &ClassificationMetrics) -> Result<()> {
        ensure_parent(&self.paths.metrics)?;
        let json = serde_json::to_string(metrics).context("Failed to serialize metrics")?;
        fs::write(&self.paths.metrics, json)
            .with_context(|| format!("Failed to write metrics to {:?}", self.paths.metrics))?;
        Ok(())
    }

    /// Metrics are passed through as raw JSON so the uploader records exactly
    /// what the trainer wrote. `Ok(None)` when the file does not exist.
    pub fn load_metrics(&self) -> Result<Option<Value>> {
        let content = match fs::read_to_string(&self.paths.metrics) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read metrics from {:?}", self.paths.metrics)
                });
            }
        };
        let metrics = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse metrics in {:?}", self.paths.metrics))?;
        Ok(Some(metrics))
    }

    /// Writes the flattened dataset as CSV for manual inspection.
    pub fn save_dump(&self, dataset: &TrainingDataset) -> Result<()> {
        ensure_parent(&self.paths.dump)?;
        let mut writer = csv::Writer::from_path(&self.paths.dump)
            .with_context(|| format!("Failed to create {:?}", self.paths.dump))?;
        writer.write_record(flattened_columns())?;
        for sample in &dataset.samples {
            writer.write_record(sample.flat_record())?;
        }
        writer.flush()?;
        info!("Saved {} rows to {:?}", dataset.len(), self.paths.dump);
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("artifact-store-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_missing_files_load_as_none() {
        let store = ArtifactStore::new(ArtifactPaths::in_dir(scratch_dir()));
        assert!(store.load_model().unwrap().is_none());
        assert!(store.load_metrics().unwrap().is_none());
    }

    #[test]
    fn test_model_and_metrics_persist() {
        let dir = scratch_dir();
        let store = ArtifactStore::new(ArtifactPaths::in_dir(&dir));

        store.save_model(&[8, 7, 1]).unwrap();
        let metrics = ClassificationMetrics::evaluate(&[1, 0], &[1, 1], 10);
        store.save_metrics(&metrics).unwrap();

        assert_eq!(store.load_model().unwrap(), Some(vec![8, 7, 1]));
        let loaded = store.load_metrics().unwrap().unwrap();
        assert_eq!(loaded["sampleSize"], 10);
        assert_eq!(loaded["accuracy"], 0.5);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_dump_has_header_and_rows() {
        let dir = scratch_dir();
        let store = ArtifactStore::new(ArtifactPaths::in_dir(&dir));
        store.save_dump(&TrainingDataset::default()).unwrap();

        let content = fs::read_to_string(&store.paths().dump).unwrap();
        let header = content.lines().next().unwrap();
        assert!(header.starts_with("signal_id,symbol,label,pnl,entry_time,rsi,adx"));
        assert!(header.ends_with("fear_greed"));

        fs::remove_dir_all(dir).ok();
    }
}
