use crate::domain::errors::SchemaError;
use serde_json::{Map, Value};

/// Version of the feature layout below. Bump on any change to `FEATURE_NAMES`.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Number of model inputs.
pub const FEATURE_COUNT: usize = 24;

/// Ordered list of feature names.
/// This order MUST match exactly with the live feature extractor that feeds the
/// exported model. The model is keyed on position, so any change here is a
/// breaking change for every model in the registry.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "rsi",
    "adx",
    "atr_rel",
    "dist_ema20",
    "dist_ema50",
    "dist_ema200",
    "dist_vwap",
    "volatility_24h",
    "volume_rel",
    "funding_rate",
    "open_interest_var",
    "long_short_ratio",
    "is_long",
    "confidence",
    "quality_score",
    "confluence_count",
    "stop_loss_pct",
    "take_profit_pct",
    "risk_reward",
    "hour_of_day",
    "day_of_week",
    "btc_trend",
    "dominance_btc",
    "fear_greed",
];

/// Index of `rsi` in the canonical order.
pub const RSI_INDEX: usize = 0;

/// Values for the canonical features, stored in `FEATURE_NAMES` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Builds the vector from a feature mapping, failing on the first
    /// canonical name that is absent or not numeric. Unknown keys are ignored.
    pub fn from_map(signal_id: &str, features: &Map<String, Value>) -> Result<Self, SchemaError> {
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES.iter()) {
            let raw = features
                .get(*name)
                .ok_or_else(|| SchemaError::MissingFeature {
                    signal_id: signal_id.to_string(),
                    feature: name.to_string(),
                })?;
            *slot = numeric_value(raw).ok_or_else(|| SchemaError::NonNumericFeature {
                signal_id: signal_id.to_string(),
                feature: name.to_string(),
                value: raw.to_string(),
            })?;
        }

        let extra = features
            .keys()
            .filter(|k| !FEATURE_NAMES.contains(&k.as_str()))
            .count();
        if extra > 0 {
            tracing::debug!("Signal {} carries {} unknown feature keys", signal_id, extra);
        }

        Ok(Self { values })
    }

    /// Decodes a `features` column that may hold either a JSON object or the
    /// JSON text of one.
    pub fn from_json(signal_id: &str, raw: &Value) -> Result<Self, SchemaError> {
        match raw {
            Value::Object(map) => Self::from_map(signal_id, map),
            Value::String(text) => {
                let parsed: Value =
                    serde_json::from_str(text).map_err(|e| SchemaError::MalformedFeatures {
                        signal_id: signal_id.to_string(),
                        reason: e.to_string(),
                    })?;
                match parsed {
                    Value::Object(map) => Self::from_map(signal_id, &map),
                    other => Err(SchemaError::MalformedFeatures {
                        signal_id: signal_id.to_string(),
                        reason: format!("expected an object, got {}", json_kind(&other)),
                    }),
                }
            }
            other => Err(SchemaError::MalformedFeatures {
                signal_id: signal_id.to_string(),
                reason: format!("expected an object or text, got {}", json_kind(other)),
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Converts into the f32 layout consumed by the exported model.
    pub fn to_f32_vector(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }

    /// Named view in canonical order.
    pub fn iter_named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.iter_named()
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect()
    }
}

fn numeric_value(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_map() -> Map<String, Value> {
        FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), json!(i as f64 / 10.0)))
            .collect()
    }

    #[test]
    fn test_feature_names_are_unique() {
        let mut names = FEATURE_NAMES.to_vec();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), FEATURE_COUNT);
        assert_eq!(FEATURE_NAMES[RSI_INDEX], "rsi");
    }

    #[test]
    fn test_object_and_text_decode_identically() {
        let map = sample_map();
        let from_object = FeatureVector::from_json("s1", &Value::Object(map.clone())).unwrap();
        let text = serde_json::to_string(&map).unwrap();
        let from_text = FeatureVector::from_json("s1", &Value::String(text)).unwrap();

        assert_eq!(from_object, from_text);
        assert_eq!(from_object.to_map(), map);
    }

    #[test]
    fn test_values_follow_canonical_order() {
        // Insertion order of the source map must not matter
        let mut reversed = Map::new();
        for (i, name) in FEATURE_NAMES.iter().enumerate().rev() {
            reversed.insert(name.to_string(), json!(i));
        }
        let fv = FeatureVector::from_map("s1", &reversed).unwrap();
        for (i, value) in fv.as_slice().iter().enumerate() {
            assert_eq!(*value, i as f64);
        }
        assert_eq!(fv.get("fear_greed"), Some(23.0));
    }

    #[test]
    fn test_missing_feature_is_rejected() {
        let mut map = sample_map();
        map.remove("dominance_btc");
        let err = FeatureVector::from_map("sig-9", &map).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MissingFeature { ref feature, .. } if feature == "dominance_btc"
        ));
    }

    #[test]
    fn test_numeric_strings_and_flags_are_accepted() {
        let mut map = sample_map();
        map.insert("rsi".into(), json!("0.75"));
        map.insert("is_long".into(), json!(true));
        let fv = FeatureVector::from_map("s1", &map).unwrap();
        assert_eq!(fv.get("rsi"), Some(0.75));
        assert_eq!(fv.get("is_long"), Some(1.0));
    }

    #[test]
    fn test_non_object_payload_is_malformed() {
        let err = FeatureVector::from_json("s1", &json!("[1, 2, 3]")).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedFeatures { .. }));
    }
}
