//! Binary classification metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label treated as the positive class by precision, recall and F1.
///
/// Target codes index the sorted labels, so for the hotel target this is
/// `Not_Canceled` (after `Canceled` = 0).
pub const POSITIVE_LABEL: i64 = 1;

/// Metric used to rank search candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scoring {
    Accuracy,
    Precision,
    Recall,
    F1,
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scoring::Accuracy => "accuracy",
            Scoring::Precision => "precision",
            Scoring::Recall => "recall",
            Scoring::F1 => "f1",
        };
        f.write_str(name)
    }
}

impl Scoring {
    pub fn score(&self, y_true: &Array1<i64>, y_pred: &Array1<i64>) -> f64 {
        EvaluationMetrics::compute(y_true, y_pred).get(*self)
    }
}

/// Held-out evaluation of a fitted classifier
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl EvaluationMetrics {
    /// Compute all metrics. Undefined ratios (no predicted or no actual positives) are 0.
    pub fn compute(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Self {
        let n = y_true.len();
        if n == 0 {
            return Self::default();
        }

        let mut correct = 0usize;
        let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            if t == p {
                correct += 1;
            }
            match (t == POSITIVE_LABEL, p == POSITIVE_LABEL) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }

        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy: correct as f64 / n as f64,
            precision,
            recall,
            f1,
        }
    }

    pub fn get(&self, scoring: Scoring) -> f64 {
        match scoring {
            Scoring::Accuracy => self.accuracy,
            Scoring::Precision => self.precision,
            Scoring::Recall => self.recall,
            Scoring::F1 => self.f1,
        }
    }

    /// Name/value pairs in a fixed order, for logging and tracking
    pub fn as_pairs(&self) -> [(&'static str, f64); 4] {
        [
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1),
        ]
    }
}
