use serde::{Deserialize, Serialize};

/// Held-out evaluation of a binary classifier.
///
/// Serialized with the camelCase keys the inference runtime reads from the
/// model registry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub sample_size: usize,
}

/// Confusion counts for the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn from_predictions(actual: &[u8], predicted: &[u8]) -> Self {
        let mut counts = Self::default();
        for (a, p) in actual.iter().zip(predicted.iter()) {
            match (*a == 1, *p == 1) {
                (true, true) => counts.true_positive += 1,
                (false, true) => counts.false_positive += 1,
                (false, false) => counts.true_negative += 1,
                (true, false) => counts.false_negative += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

/// Division that evaluates to 0 when the denominator is 0.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

impl ClassificationMetrics {
    /// Computes metrics over `actual` vs `predicted`; `sample_size` is
    /// recorded as given (the full dataset size, not the test split).
    pub fn evaluate(actual: &[u8], predicted: &[u8], sample_size: usize) -> Self {
        let c = ConfusionCounts::from_predictions(actual, predicted);
        let tp = c.true_positive as f64;

        let accuracy = ratio((c.true_positive + c.true_negative) as f64, c.total() as f64);
        let precision = ratio(tp, tp + c.false_positive as f64);
        let recall = ratio(tp, tp + c.false_negative as f64);
        let f1_score = ratio(2.0 * precision * recall, precision + recall);

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            sample_size,
        }
    }
}
