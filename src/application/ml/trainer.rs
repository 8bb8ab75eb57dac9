use super::data_fetcher::fetch_training_data;
use super::dataset_split::{SPLIT_SEED, TEST_FRACTION, TrainTestSplit, select, train_test_split};
use super::gradient_boosting::{BoostingParams, GradientBoostedClassifier};
use super::onnx_export;
use crate::domain::errors::TrainingError;
use crate::domain::ml::feature_registry::FEATURE_COUNT;
use crate::domain::ml::metrics::ClassificationMetrics;
use crate::domain::ml::training_record::TrainingDataset;
use crate::domain::ports::TrainingDataStore;
use crate::infrastructure::persistence::ArtifactStore;
use anyhow::{Context, Result};
use tracing::info;

/// Result of fitting and evaluating on one dataset.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub classifier: GradientBoostedClassifier,
    pub metrics: ClassificationMetrics,
    pub split: TrainTestSplit,
}

/// Splits the dataset, fits the ensemble on the training rows and scores the
/// held-out rows. Same dataset, same result.
pub fn train_on_dataset(
    dataset: &TrainingDataset,
    params: BoostingParams,
) -> Result<TrainedModel, TrainingError> {
    if dataset.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }

    let x = dataset.feature_matrix();
    let y = dataset.labels();
    if let Some(row) = x.iter().find(|r| r.len() != FEATURE_COUNT) {
        return Err(TrainingError::FeatureWidth {
            expected: FEATURE_COUNT,
            actual: row.len(),
        });
    }

    let split = train_test_split(dataset.len(), TEST_FRACTION, SPLIT_SEED);
    if split.train.is_empty() {
        return Err(TrainingError::InsufficientSamples {
            samples: dataset.len(),
        });
    }

    info!("Dataset size: {} samples", dataset.len());
    info!("Training set: {} samples", split.train.len());
    info!("Test set: {} samples", split.test.len());

    let x_train = select(&x, &split.train);
    let y_train = select(&y, &split.train);
    let x_test = select(&x, &split.test);
    let y_test = select(&y, &split.test);

    info!(
        "Training gradient boosted trees (Trees: {}, Depth: {}, LR: {})...",
        params.n_estimators, params.max_depth, params.learning_rate
    );
    let classifier = GradientBoostedClassifier::fit(&x_train, &y_train, params)?;

    let predicted = classifier.predict(&x_test);
    let metrics = ClassificationMetrics::evaluate(&y_test, &predicted, dataset.len());

    Ok(TrainedModel {
        classifier,
        metrics,
        split,
    })
}

/// Full training stage: fetch, fit, evaluate, export, persist.
///
/// Nothing is written when the fetch comes back empty.
pub async fn run_training(
    store: &dyn TrainingDataStore,
    artifacts: &ArtifactStore,
) -> Result<ClassificationMetrics> {
    info!("Starting training pipeline...");

    let dataset = fetch_training_data(store).await?;
    let trained = train_on_dataset(&dataset, BoostingParams::default())?;

    info!(
        "Metrics:\n{}",
        serde_json::to_string_pretty(&trained.metrics).context("Failed to render metrics")?
    );

    let bytes = onnx_export::to_onnx_bytes(&trained.classifier);
    artifacts.save_model(&bytes)?;
    artifacts.save_metrics(&trained.metrics)?;

    info!("Training complete.");
    Ok(trained.metrics)
}
