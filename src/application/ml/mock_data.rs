//! Synthetic training rows for exercising the pipeline without real signals.
//!
//! Labels follow `rsi > 0.5`, so a correctly wired trainer should reach
//! near-perfect accuracy on this data.

use crate::domain::ml::feature_registry::{FEATURE_COUNT, FeatureVector, RSI_INDEX};
use crate::domain::ml::training_record::NewSignalRecord;
use crate::domain::ports::{TrainingDataStore, UserDirectory};
use anyhow::{Context, Result};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

pub const MOCK_ROW_COUNT: usize = 20;
pub const MOCK_SYMBOLS: [&str; 2] = ["BTCUSDT", "ETHUSDT"];
pub const MOCK_ENTRY_TIME: &str = "2024-01-01T12:00:00Z";

/// Builds `count` rows with uniform random features in [0, 1).
pub fn generate_mock_rows<R: Rng + ?Sized>(
    user_id: Uuid,
    count: usize,
    rng: &mut R,
) -> Result<Vec<NewSignalRecord>> {
    (0..count)
        .map(|i| {
            let mut values = [0.0; FEATURE_COUNT];
            for v in values.iter_mut() {
                *v = rng.random::<f64>();
            }
            let features = FeatureVector::from_array(values);
            let label = u8::from(values[RSI_INDEX] > 0.5);

            Ok(NewSignalRecord {
                user_id,
                signal_id: format!("mock_signal_{}", i),
                symbol: MOCK_SYMBOLS[i % MOCK_SYMBOLS.len()].to_string(),
                entry_time: MOCK_ENTRY_TIME.to_string(),
                features: serde_json::to_string(&features.to_map())
                    .context("Failed to serialize mock features")?,
                outcome_label: label,
                outcome_pnl: rng.random_range(-10.0..20.0),
            })
        })
        .collect()
}

/// Resolves an owning user, generates `MOCK_ROW_COUNT` rows and inserts them
/// in one batch. Returns the number of rows the store accepted.
pub async fn seed_mock_data<R: Rng + ?Sized>(
    users: &dyn UserDirectory,
    store: &dyn TrainingDataStore,
    rng: &mut R,
) -> Result<usize> {
    info!("Generating mock data...");

    let user_id = users
        .first_user_id()
        .await
        .context("Cannot create mock data without a user")?;
    info!("Using User ID: {}", user_id);

    let rows = generate_mock_rows(user_id, MOCK_ROW_COUNT, rng)?;
    let inserted = store
        .insert_training_rows(&rows)
        .await
        .context("Error inserting mock data")?;

    info!("Inserted {} mock rows.", inserted);
    Ok(inserted)
}
