use crate::domain::ml::training_record::{SignalRecord, TrainingDataset};
use crate::domain::ports::TrainingDataStore;
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Row cap for a single fetch. Rows past the cap are not paged in.
pub const TRAINING_FETCH_LIMIT: usize = 10_000;

/// Number of samples shown by `log_preview`.
const PREVIEW_ROWS: usize = 5;

/// Pulls labeled outcomes from the store and flattens them into samples.
///
/// An empty table yields an empty dataset; a row whose features do not match
/// the canonical layout fails the whole fetch.
pub async fn fetch_training_data(store: &dyn TrainingDataStore) -> Result<TrainingDataset> {
    info!("Fetching training data...");

    let rows = store
        .fetch_training_rows(TRAINING_FETCH_LIMIT)
        .await
        .context("Failed to fetch training data")?;

    if rows.is_empty() {
        warn!("No data found in 'ml_training_data'.");
        warn!("Possible reasons: the table is empty (collect a dataset first),");
        warn!("or row level security is blocking access (use the service role key).");
        return Ok(TrainingDataset::default());
    }

    info!("Retrieved {} samples.", rows.len());
    if rows.len() >= TRAINING_FETCH_LIMIT {
        warn!(
            "Fetch cap of {} rows reached; older rows were not retrieved.",
            TRAINING_FETCH_LIMIT
        );
    }

    let samples = rows
        .iter()
        .map(SignalRecord::flatten)
        .collect::<Result<Vec<_>, _>>()
        .context("Training data does not match the feature layout")?;

    Ok(TrainingDataset::new(samples))
}

/// Logs a short summary of a fetched dataset.
pub fn log_preview(dataset: &TrainingDataset) {
    let (negatives, positives) = dataset.label_balance();
    info!(
        "Dataset: {} samples ({} positive, {} negative)",
        dataset.len(),
        positives,
        negatives
    );

    if let Some((first, last)) = dataset.entry_time_range() {
        info!("Entries span {} to {}", first, last);
    }

    for sample in dataset.samples.iter().take(PREVIEW_ROWS) {
        info!(
            "  {} {} label={} pnl={} rsi={:.4}",
            sample.signal_id,
            sample.symbol,
            sample.label,
            sample
                .pnl
                .map(|p| format!("{:.2}", p))
                .unwrap_or_else(|| "-".to_string()),
            sample.features.get("rsi").unwrap_or_default()
        );
    }
}
