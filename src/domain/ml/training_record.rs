use super::feature_registry::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};
use crate::domain::errors::SchemaError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Scalar columns carried next to the features in a flattened sample.
pub const METADATA_COLUMNS: [&str; 5] = ["signal_id", "symbol", "label", "pnl", "entry_time"];

/// One row of `ml_training_data` as returned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalRecord {
    #[serde(default)]
    pub signal_id: Value,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub features: Value,
    #[serde(default)]
    pub outcome_label: Value,
    #[serde(default)]
    pub outcome_pnl: Value,
    #[serde(default)]
    pub entry_time: Option<String>,
}

/// Row shape inserted by the mock generator.
#[derive(Debug, Clone, Serialize)]
pub struct NewSignalRecord {
    pub user_id: Uuid,
    pub signal_id: String,
    pub symbol: String,
    pub entry_time: String,
    /// JSON text of the feature mapping
    pub features: String,
    pub outcome_label: u8,
    pub outcome_pnl: f64,
}

/// Flattened training sample: metadata plus the canonical features.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub signal_id: String,
    pub symbol: String,
    pub label: u8,
    pub pnl: Option<f64>,
    pub entry_time: Option<String>,
    pub features: FeatureVector,
}

impl SignalRecord {
    /// Flattens the row, decoding `features` from text when needed.
    pub fn flatten(&self) -> Result<TrainingSample, SchemaError> {
        let signal_id = match &self.signal_id {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };

        let features = FeatureVector::from_json(&signal_id, &self.features)?;

        let label = parse_label(&self.outcome_label).ok_or_else(|| SchemaError::InvalidField {
            signal_id: signal_id.clone(),
            field: "outcome_label",
            value: self.outcome_label.to_string(),
        })?;

        let pnl = match &self.outcome_pnl {
            Value::Null => None,
            Value::Number(n) => n.as_f64(),
            Value::String(s) => Some(s.trim().parse().map_err(|_| SchemaError::InvalidField {
                signal_id: signal_id.clone(),
                field: "outcome_pnl",
                value: s.clone(),
            })?),
            other => {
                return Err(SchemaError::InvalidField {
                    signal_id,
                    field: "outcome_pnl",
                    value: other.to_string(),
                });
            }
        };

        Ok(TrainingSample {
            signal_id,
            symbol: self.symbol.clone().unwrap_or_default(),
            label,
            pnl,
            entry_time: self.entry_time.clone(),
            features,
        })
    }
}

fn parse_label(raw: &Value) -> Option<u8> {
    match raw {
        Value::Number(n) => match n.as_f64()? {
            v if v == 0.0 => Some(0),
            v if v == 1.0 => Some(1),
            _ => None,
        },
        Value::Bool(b) => Some(u8::from(*b)),
        Value::String(s) => match s.trim() {
            "0" => Some(0),
            "1" => Some(1),
            _ => None,
        },
        _ => None,
    }
}

/// Column names of a flattened sample, metadata first.
pub fn flattened_columns() -> Vec<&'static str> {
    METADATA_COLUMNS
        .iter()
        .chain(FEATURE_NAMES.iter())
        .copied()
        .collect()
}

impl TrainingSample {
    /// Field values in `flattened_columns()` order, rendered as text.
    pub fn flat_record(&self) -> Vec<String> {
        let mut record = Vec::with_capacity(METADATA_COLUMNS.len() + FEATURE_COUNT);
        record.push(self.signal_id.clone());
        record.push(self.symbol.clone());
        record.push(self.label.to_string());
        record.push(self.pnl.map(|p| p.to_string()).unwrap_or_default());
        record.push(self.entry_time.clone().unwrap_or_default());
        record.extend(self.features.as_slice().iter().map(|v| v.to_string()));
        record
    }
}

/// The tabular result of a fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingDataset {
    pub samples: Vec<TrainingSample>,
}

impl TrainingDataset {
    pub fn new(samples: Vec<TrainingSample>) -> Self {
        Self { samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Model inputs in canonical feature order.
    pub fn feature_matrix(&self) -> Vec<Vec<f32>> {
        self.samples
            .iter()
            .map(|s| s.features.to_f32_vector())
            .collect()
    }

    pub fn labels(&self) -> Vec<u8> {
        self.samples.iter().map(|s| s.label).collect()
    }

    /// (negatives, positives)
    pub fn label_balance(&self) -> (usize, usize) {
        let positives = self.samples.iter().filter(|s| s.label == 1).count();
        (self.samples.len() - positives, positives)
    }

    /// Earliest and latest parseable `entry_time`.
    pub fn entry_time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let times = self
            .samples
            .iter()
            .filter_map(|s| s.entry_time.as_deref())
            .filter_map(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));

        times.fold(None, |range, t| match range {
            None => Some((t, t)),
            Some((first, last)) => Some((first.min(t), last.max(t))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn features_json() -> Value {
        let map: serde_json::Map<String, Value> = FEATURE_NAMES
            .iter()
            .map(|n| (n.to_string(), json!(0.25)))
            .collect();
        Value::Object(map)
    }

    #[test]
    fn test_flatten_structured_row() {
        let record: SignalRecord = serde_json::from_value(json!({
            "id": 7,
            "signal_id": "sig-1",
            "symbol": "BTCUSDT",
            "features": features_json(),
            "outcome_label": 1,
            "outcome_pnl": "12.5",
            "entry_time": "2024-01-01T12:00:00Z"
        }))
        .unwrap();

        let sample = record.flatten().unwrap();
        assert_eq!(sample.signal_id, "sig-1");
        assert_eq!(sample.label, 1);
        assert_eq!(sample.pnl, Some(12.5));

        let record = sample.flat_record();
        let columns = flattened_columns();
        assert_eq!(record.len(), 29);
        assert_eq!(columns.len(), 29);
        assert_eq!(&columns[..5], &METADATA_COLUMNS);
        assert_eq!(&columns[5..], &FEATURE_NAMES);
    }

    #[test]
    fn test_flatten_text_encoded_row() {
        let text = serde_json::to_string(&features_json()).unwrap();
        let record: SignalRecord = serde_json::from_value(json!({
            "signal_id": "sig-2",
            "symbol": "ETHUSDT",
            "features": text,
            "outcome_label": 0,
            "outcome_pnl": -3.0,
            "entry_time": null
        }))
        .unwrap();

        let sample = record.flatten().unwrap();
        assert_eq!(sample.label, 0);
        assert_eq!(sample.entry_time, None);
        assert!(sample.features.as_slice().iter().all(|v| *v == 0.25));
    }

    #[test]
    fn test_entry_time_range_skips_unparseable() {
        let sample = |time: Option<&str>| TrainingSample {
            signal_id: "s".into(),
            symbol: "BTCUSDT".into(),
            label: 0,
            pnl: None,
            entry_time: time.map(String::from),
            features: FeatureVector::from_array([0.0; FEATURE_COUNT]),
        };
        let dataset = TrainingDataset::new(vec![
            sample(Some("2024-01-02T00:00:00Z")),
            sample(Some("yesterday")),
            sample(None),
            sample(Some("2024-01-01T12:00:00+00:00")),
        ]);

        let (first, last) = dataset.entry_time_range().unwrap();
        assert_eq!(first.to_rfc3339(), "2024-01-01T12:00:00+00:00");
        assert_eq!(last.to_rfc3339(), "2024-01-02T00:00:00+00:00");
        assert!(TrainingDataset::default().entry_time_range().is_none());
    }

    #[test]
    fn test_invalid_label_is_rejected() {
        let record: SignalRecord = serde_json::from_value(json!({
            "signal_id": "sig-3",
            "features": features_json(),
            "outcome_label": 2
        }))
        .unwrap();
        assert!(matches!(
            record.flatten(),
            Err(SchemaError::InvalidField { field: "outcome_label", .. })
        ));
    }
}
