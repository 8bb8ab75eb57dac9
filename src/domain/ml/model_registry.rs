use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Version tag written with every uploaded model.
pub const MODEL_VERSION_TAG: &str = "v1_xgboost";

/// Type tag the inference runtime uses to pick its loader.
pub const MODEL_TYPE_TAG: &str = "xgboost_onnx";

/// Transport encoding of the model bytes.
pub const PAYLOAD_FORMAT_BASE64: &str = "base64";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPayload {
    pub format: String,
    pub content: String,
}

/// Row written to `ml_models`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistryEntry {
    pub user_id: Uuid,
    pub version: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub data: ModelPayload,
    pub metrics: Value,
    pub is_active: bool,
}

impl ModelRegistryEntry {
    /// Builds an active entry with the fixed version and type tags.
    pub fn active(user_id: Uuid, encoded_model: String, metrics: Value) -> Self {
        Self {
            user_id,
            version: MODEL_VERSION_TAG.to_string(),
            model_type: MODEL_TYPE_TAG.to_string(),
            data: ModelPayload {
                format: PAYLOAD_FORMAT_BASE64.to_string(),
                content: encoded_model,
            },
            metrics,
            is_active: true,
        }
    }
}

/// What happens to entries already marked active when a new model is
/// uploaded. Several active entries may coexist under `KeepExisting`; how the
/// runtime picks between them is up to the runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivationPolicy {
    #[default]
    KeepExisting,
    DeactivatePrevious,
}
