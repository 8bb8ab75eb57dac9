use prost::Message;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use signal_model_pipeline::application::ml::data_fetcher::fetch_training_data;
use signal_model_pipeline::application::ml::gradient_boosting::BoostingParams;
use signal_model_pipeline::application::ml::mock_data::generate_mock_rows;
use signal_model_pipeline::application::ml::onnx_export::{
    ExportedEnsemble, INPUT_NAME, declared_input, to_onnx_bytes,
};
use signal_model_pipeline::application::ml::trainer::{run_training, train_on_dataset};
use signal_model_pipeline::application::ml::uploader::upload_model;
use signal_model_pipeline::config::ArtifactPaths;
use signal_model_pipeline::domain::ml::feature_registry::{FEATURE_COUNT, FEATURE_NAMES};
use signal_model_pipeline::domain::ml::model_registry::ActivationPolicy;
use signal_model_pipeline::domain::ml::training_record::SignalRecord;
use signal_model_pipeline::infrastructure::onnx::ModelProto;
use signal_model_pipeline::infrastructure::persistence::ArtifactStore;
use signal_model_pipeline::infrastructure::repositories::InMemoryStore;
use uuid::Uuid;

fn scratch_artifacts() -> ArtifactStore {
    let dir = std::env::temp_dir().join(format!("pipeline-it-{}", Uuid::new_v4()));
    ArtifactStore::new(ArtifactPaths::in_dir(dir))
}

/// Rows as the store returns them, with `features` as a JSON object.
fn stored_row(i: usize, rsi: f64, filler: f64) -> SignalRecord {
    let features: serde_json::Map<String, Value> = FEATURE_NAMES
        .iter()
        .enumerate()
        .map(|(k, name)| {
            let v = if k == 0 { rsi } else { filler };
            (name.to_string(), json!(v))
        })
        .collect();
    serde_json::from_value(json!({
        "id": i,
        "signal_id": format!("sig_{}", i),
        "symbol": if i % 2 == 0 { "BTCUSDT" } else { "ETHUSDT" },
        "features": features,
        "outcome_label": u8::from(rsi > 0.5),
        "outcome_pnl": if rsi > 0.5 { 4.0 } else { -2.0 },
        "entry_time": format!("2024-01-01T{:02}:00:00Z", i % 24)
    }))
    .unwrap()
}

/// 25 rows over four RSI levels; every level appears at least six times, so
/// the training partition always covers all of them.
fn separable_rows() -> Vec<SignalRecord> {
    let levels = [0.2, 0.3, 0.7, 0.8];
    (0..25)
        .map(|i| stored_row(i, levels[i % levels.len()], (i % 7) as f64 / 7.0))
        .collect()
}

#[tokio::test]
async fn test_training_recovers_rsi_rule_end_to_end() {
    let store = InMemoryStore::new()
        .with_user(Uuid::new_v4())
        .with_training_rows(separable_rows());
    let artifacts = scratch_artifacts();

    let metrics = run_training(&store, &artifacts).await.unwrap();
    assert_eq!(metrics.sample_size, 25);
    assert_eq!(metrics.accuracy, 1.0);

    let saved = artifacts.load_metrics().unwrap().unwrap();
    for key in ["accuracy", "precision", "recall", "f1Score", "sampleSize"] {
        assert!(saved.get(key).is_some(), "metrics file lacks {}", key);
    }
    assert_eq!(saved["sampleSize"], 25);

    let bytes = artifacts.load_model().unwrap().unwrap();
    let model = ModelProto::decode(bytes.as_slice()).unwrap();
    let (name, dims) = declared_input(&model).unwrap();
    assert_eq!(name, INPUT_NAME);
    assert_eq!(dims, vec![None, Some(FEATURE_COUNT as i64)]);

    let ensemble = ExportedEnsemble::decode(&bytes).unwrap();
    let mut high = vec![0.5_f32; FEATURE_COUNT];
    high[0] = 0.8;
    let mut low = high.clone();
    low[0] = 0.2;
    assert!(ensemble.predict_proba(&high).unwrap() > 0.5);
    assert!(ensemble.predict_proba(&low).unwrap() < 0.5);
}

#[tokio::test]
async fn test_training_is_reproducible() {
    let store = InMemoryStore::new().with_training_rows(separable_rows());
    let dataset = fetch_training_data(&store).await.unwrap();

    let first = train_on_dataset(&dataset, BoostingParams::default()).unwrap();
    let second = train_on_dataset(&dataset, BoostingParams::default()).unwrap();

    assert_eq!(first.split, second.split);
    assert_eq!(first.metrics, second.metrics);
    assert_eq!(
        to_onnx_bytes(&first.classifier),
        to_onnx_bytes(&second.classifier)
    );
}

#[tokio::test]
async fn test_mock_rows_train_to_high_accuracy() {
    let user = Uuid::new_v4();
    let store = InMemoryStore::new().with_user(user);
    let mut rng = StdRng::seed_from_u64(2024);
    let rows = generate_mock_rows(user, 200, &mut rng).unwrap();
    signal_model_pipeline::domain::ports::TrainingDataStore::insert_training_rows(&store, &rows)
        .await
        .unwrap();

    let dataset = fetch_training_data(&store).await.unwrap();
    assert_eq!(dataset.len(), 200);

    let trained = train_on_dataset(&dataset, BoostingParams::default()).unwrap();
    assert_eq!(trained.split.test.len(), 40);
    assert!(
        trained.metrics.accuracy >= 0.9,
        "accuracy {}",
        trained.metrics.accuracy
    );
}

#[tokio::test]
async fn test_trained_model_uploads_with_metrics() {
    let user = Uuid::new_v4();
    let store = InMemoryStore::new()
        .with_user(user)
        .with_training_rows(separable_rows());
    let artifacts = scratch_artifacts();

    run_training(&store, &artifacts).await.unwrap();
    let receipt = upload_model(&artifacts, &store, &store, ActivationPolicy::KeepExisting)
        .await
        .unwrap();
    assert_eq!(receipt.id, Some(json!(1)));

    let models = store.models().await;
    assert_eq!(models.len(), 1);
    let entry = &models[0].entry;
    assert_eq!(entry.user_id, user);
    assert_eq!(entry.version, "v1_xgboost");
    assert_eq!(entry.model_type, "xgboost_onnx");
    assert_eq!(entry.metrics["sampleSize"], 25);
    assert!(entry.is_active);
}

#[tokio::test]
async fn test_empty_store_writes_no_artifacts() {
    let store = InMemoryStore::new();
    let artifacts = scratch_artifacts();

    assert!(run_training(&store, &artifacts).await.is_err());
    assert!(artifacts.load_model().unwrap().is_none());
    assert!(artifacts.load_metrics().unwrap().is_none());
}
