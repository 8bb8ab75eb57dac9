use super::users;
use crate::config::StoreConfig;
use crate::domain::errors::StoreError;
use crate::domain::ml::model_registry::ModelRegistryEntry;
use crate::domain::ml::training_record::{NewSignalRecord, SignalRecord};
use crate::domain::ports::{ModelRegistry, TrainingDataStore, UserDirectory};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

pub const TRAINING_TABLE: &str = "ml_training_data";
pub const MODELS_TABLE: &str = "ml_models";

const REST_PREFIX: &str = "rest/v1";
const ADMIN_USERS_PATH: &str = "auth/v1/admin/users";

/// Table and admin access to a hosted Supabase project.
///
/// Calls are sent once; failures surface as `StoreError` without retries.
pub struct SupabaseClient {
    client: Client,
    config: StoreConfig,
}

impl SupabaseClient {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: StoreConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn table_url(&self, table: &str) -> String {
        self.config.endpoint(&format!("{}/{}", REST_PREFIX, table))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.key)
            .bearer_auth(&self.config.key)
    }

    /// Turns a non-success response into `StoreError::Api`, using the error
    /// body's message field when there is one.
    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                ["message", "msg", "error_description", "error"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(Value::as_str).map(String::from))
            })
            .unwrap_or(body);

        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn rows(response: Response) -> Result<Vec<Value>, StoreError> {
        let body: Value = Self::check(response).await?.json().await?;
        match body {
            Value::Array(rows) => Ok(rows),
            other => Err(StoreError::UnexpectedShape {
                detail: format!("expected a list of rows, got {}", other),
            }),
        }
    }
}

#[async_trait]
impl TrainingDataStore for SupabaseClient {
    async fn fetch_training_rows(&self, limit: usize) -> Result<Vec<SignalRecord>, StoreError> {
        let limit = limit.to_string();
        let response = self
            .authorized(self.client.get(self.table_url(TRAINING_TABLE)))
            .query(&[("select", "*"), ("limit", limit.as_str())])
            .send()
            .await?;

        let rows = Self::rows(response).await?;
        debug!("Fetched {} raw rows from {}", rows.len(), TRAINING_TABLE);

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| StoreError::UnexpectedShape {
                    detail: format!("unreadable {} row: {}", TRAINING_TABLE, e),
                })
            })
            .collect()
    }

    async fn insert_training_rows(&self, rows: &[NewSignalRecord]) -> Result<usize, StoreError> {
        let response = self
            .authorized(self.client.post(self.table_url(TRAINING_TABLE)))
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await?;

        Ok(Self::rows(response).await?.len())
    }
}

#[async_trait]
impl ModelRegistry for SupabaseClient {
    async fn insert_model(&self, entry: &ModelRegistryEntry) -> Result<Option<Value>, StoreError> {
        let response = self
            .authorized(self.client.post(self.table_url(MODELS_TABLE)))
            .header("Prefer", "return=representation")
            .json(entry)
            .send()
            .await?;

        let rows = Self::rows(response).await?;
        Ok(rows.first().and_then(|row| row.get("id")).cloned())
    }

    async fn deactivate_active_models(&self) -> Result<usize, StoreError> {
        let response = self
            .authorized(self.client.patch(self.table_url(MODELS_TABLE)))
            .query(&[("is_active", "eq.true")])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "is_active": false }))
            .send()
            .await?;

        Ok(Self::rows(response).await?.len())
    }
}

#[async_trait]
impl UserDirectory for SupabaseClient {
    async fn first_user_id(&self) -> Result<Uuid, StoreError> {
        let response = self
            .authorized(self.client.get(self.config.endpoint(ADMIN_USERS_PATH)))
            .send()
            .await?;

        let body: Value = Self::check(response).await?.json().await?;
        users::first_user_id(&body)
    }
}
