//! In-Memory Store Implementation
//!
//! Implements the store ports from `domain::ports` over plain vectors so the
//! stages can run without a remote project (tests, local dry runs).
//!
//! Inserted training rows are kept in the shape a real store would return
//! them (`features` stays JSON text), so a fetch after a mock insert goes
//! through the same decoding path as production data.

use crate::domain::errors::StoreError;
use crate::domain::ml::model_registry::ModelRegistryEntry;
use crate::domain::ml::training_record::{NewSignalRecord, SignalRecord};
use crate::domain::ports::{ModelRegistry, TrainingDataStore, UserDirectory};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredModel {
    pub id: u64,
    pub entry: ModelRegistryEntry,
}

pub struct InMemoryStore {
    training_rows: Arc<RwLock<Vec<SignalRecord>>>,
    models: Arc<RwLock<Vec<StoredModel>>>,
    users: Vec<Uuid>,
    calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            training_rows: Arc::new(RwLock::new(Vec::new())),
            models: Arc::new(RwLock::new(Vec::new())),
            users: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.users.push(user_id);
        self
    }

    pub fn with_training_rows(self, rows: Vec<SignalRecord>) -> Self {
        Self {
            training_rows: Arc::new(RwLock::new(rows)),
            ..self
        }
    }

    pub async fn models(&self) -> Vec<StoredModel> {
        self.models.read().await.clone()
    }

    pub async fn training_row_count(&self) -> usize {
        self.training_rows.read().await.len()
    }

    /// Number of port calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrainingDataStore for InMemoryStore {
    async fn fetch_training_rows(&self, limit: usize) -> Result<Vec<SignalRecord>, StoreError> {
        self.record_call();
        let rows = self.training_rows.read().await;
        Ok(rows.iter().take(limit).cloned().collect())
    }

    async fn insert_training_rows(&self, rows: &[NewSignalRecord]) -> Result<usize, StoreError> {
        self.record_call();
        let mut stored = self.training_rows.write().await;
        for row in rows {
            stored.push(SignalRecord {
                signal_id: Value::String(row.signal_id.clone()),
                symbol: Some(row.symbol.clone()),
                features: Value::String(row.features.clone()),
                outcome_label: Value::from(row.outcome_label),
                outcome_pnl: Value::from(row.outcome_pnl),
                entry_time: Some(row.entry_time.clone()),
            });
        }
        Ok(rows.len())
    }
}

#[async_trait]
impl ModelRegistry for InMemoryStore {
    async fn insert_model(&self, entry: &ModelRegistryEntry) -> Result<Option<Value>, StoreError> {
        self.record_call();
        let mut models = self.models.write().await;
        let id = models.len() as u64 + 1;
        models.push(StoredModel {
            id,
            entry: entry.clone(),
        });
        Ok(Some(Value::from(id)))
    }

    async fn deactivate_active_models(&self) -> Result<usize, StoreError> {
        self.record_call();
        let mut models = self.models.write().await;
        let mut touched = 0;
        for model in models.iter_mut().filter(|m| m.entry.is_active) {
            model.entry.is_active = false;
            touched += 1;
        }
        Ok(touched)
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn first_user_id(&self) -> Result<Uuid, StoreError> {
        self.record_call();
        self.users.first().copied().ok_or(StoreError::NoUsers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_then_fetch_keeps_text_features() {
        let store = InMemoryStore::new();
        let row = NewSignalRecord {
            user_id: Uuid::nil(),
            signal_id: "s1".into(),
            symbol: "BTCUSDT".into(),
            entry_time: "2024-01-01T12:00:00Z".into(),
            features: "{\"rsi\":0.5}".into(),
            outcome_label: 1,
            outcome_pnl: 2.0,
        };
        assert_eq!(store.insert_training_rows(&[row]).await.unwrap(), 1);

        let rows = store.fetch_training_rows(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].features.is_string());
        assert_eq!(store.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_respects_limit() {
        let rows = (0..5)
            .map(|i| SignalRecord {
                signal_id: json!(i),
                symbol: None,
                features: json!({}),
                outcome_label: json!(0),
                outcome_pnl: Value::Null,
                entry_time: None,
            })
            .collect();
        let store = InMemoryStore::new().with_training_rows(rows);
        assert_eq!(store.fetch_training_rows(3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_no_users() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.first_user_id().await,
            Err(StoreError::NoUsers)
        ));
    }
}
