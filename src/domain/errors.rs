use thiserror::Error;

/// Errors raised while validating process configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {name}")]
    Missing { name: &'static str },

    #[error("Setting {name} still holds a placeholder value")]
    Placeholder { name: &'static str },

    #[error("Invalid store URL {value}: {reason}")]
    InvalidUrl { value: String, reason: String },
}

/// Errors raised at the remote store boundary
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("No users found in auth.users")]
    NoUsers,

    #[error("Unexpected response shape: {detail}")]
    UnexpectedShape { detail: String },
}

/// Errors raised when incoming rows do not match the feature layout
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Signal {signal_id} is missing feature '{feature}'")]
    MissingFeature { signal_id: String, feature: String },

    #[error("Signal {signal_id} has non-numeric feature '{feature}': {value}")]
    NonNumericFeature {
        signal_id: String,
        feature: String,
        value: String,
    },

    #[error("Signal {signal_id} has malformed features: {reason}")]
    MalformedFeatures { signal_id: String, reason: String },

    #[error("Signal {signal_id} has invalid {field}: {value}")]
    InvalidField {
        signal_id: String,
        field: &'static str,
        value: String,
    },
}

/// Errors raised by the training stage
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("No data available for training")]
    EmptyDataset,

    #[error("Training partition is empty ({samples} samples in total)")]
    InsufficientSamples { samples: usize },

    #[error("Feature matrix has {actual} columns, expected {expected}")]
    FeatureWidth { expected: usize, actual: usize },

    #[error("Feature matrix has {rows} rows but {labels} labels")]
    LabelCount { rows: usize, labels: usize },
}

/// Errors raised by the upload stage
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Model artifact not found at {path}. Run train_model first.")]
    ModelArtifactMissing { path: String },
}
