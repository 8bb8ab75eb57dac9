use crate::domain::errors::UploadError;
use crate::domain::ml::model_registry::{ActivationPolicy, ModelRegistryEntry};
use crate::domain::ports::{ModelRegistry, UserDirectory};
use crate::infrastructure::persistence::ArtifactStore;
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tracing::{info, warn};

/// What the registry reported back for an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    /// Id of the new registry row, when the store returned the row.
    pub id: Option<Value>,
    pub deactivated: usize,
}

/// Reads the trainer's artifacts and writes them to the model registry.
///
/// The model file is checked before any remote call, so a missing model never
/// reaches the store. A missing metrics file is recorded as `{}`.
pub async fn upload_model(
    artifacts: &ArtifactStore,
    users: &dyn UserDirectory,
    registry: &dyn ModelRegistry,
    policy: ActivationPolicy,
) -> Result<UploadReceipt> {
    info!("Uploading model...");

    let model_bytes = artifacts
        .load_model()?
        .ok_or_else(|| UploadError::ModelArtifactMissing {
            path: artifacts.paths().model.display().to_string(),
        })?;
    let encoded = STANDARD.encode(&model_bytes);

    let metrics = match artifacts.load_metrics()? {
        Some(metrics) => metrics,
        None => {
            warn!("Metrics file not found, using empty metrics.");
            json!({})
        }
    };

    let user_id = users
        .first_user_id()
        .await
        .context("Error fetching users")?;

    let deactivated = match policy {
        ActivationPolicy::KeepExisting => 0,
        ActivationPolicy::DeactivatePrevious => {
            let count = registry
                .deactivate_active_models()
                .await
                .context("Failed to deactivate previous models")?;
            info!("Deactivated {} previously active models", count);
            count
        }
    };

    let entry = ModelRegistryEntry::active(user_id, encoded, metrics);
    let id = registry
        .insert_model(&entry)
        .await
        .context("Upload failed")?;

    match &id {
        Some(id) => info!("Model uploaded successfully! ID: {}", id),
        None => info!("Model uploaded but no data returned."),
    }

    Ok(UploadReceipt { id, deactivated })
}
