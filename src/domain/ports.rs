use crate::domain::errors::StoreError;
use crate::domain::ml::model_registry::ModelRegistryEntry;
use crate::domain::ml::training_record::{NewSignalRecord, SignalRecord};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// Table of labeled signal outcomes.
#[async_trait]
pub trait TrainingDataStore: Send + Sync {
    /// Returns at most `limit` rows in store order.
    async fn fetch_training_rows(&self, limit: usize) -> Result<Vec<SignalRecord>, StoreError>;

    /// Inserts rows in one request and returns how many the store accepted.
    async fn insert_training_rows(&self, rows: &[NewSignalRecord]) -> Result<usize, StoreError>;
}

/// Table of serialized models consumed by the inference runtime.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Inserts the entry and returns the stored row's id, if the store
    /// returned one.
    async fn insert_model(&self, entry: &ModelRegistryEntry) -> Result<Option<Value>, StoreError>;

    /// Clears `is_active` on every active entry. Returns the number of rows
    /// touched when the store reports it.
    async fn deactivate_active_models(&self) -> Result<usize, StoreError>;
}

/// Source of a user identity that satisfies the tables' foreign keys.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn first_user_id(&self) -> Result<Uuid, StoreError>;
}
