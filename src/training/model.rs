//! Persisted model artifact

use super::lightgbm::LightGBMClassifier;
use super::metrics::EvaluationMetrics;
use crate::error::{PipelineError, Result};
use crate::optimizer::BoostParams;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Fitted classifier plus what is needed to feed it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Feature columns in the order the classifier expects them
    pub feature_names: Vec<String>,
    pub target_column: String,
    pub classifier: LightGBMClassifier,
    pub best_params: BoostParams,
    /// Mean cross-validation score of the winning candidate
    pub cv_score: f64,
    pub metrics: EvaluationMetrics,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        self.classifier.predict(x)
    }

    /// Label for one row in [`Self::feature_names`] order
    pub fn predict_row(&self, row: &[f64]) -> Result<i64> {
        self.classifier.predict_row(row)
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Serialize with bincode, creating parent directories and overwriting
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        info!(path = %path.display(), "Saved model artifact");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PipelineError::Io(std::io::Error::new(
                e.kind(),
                format!("model artifact {}: {}", path.display(), e),
            ))
        })?;
        let artifact: Self = bincode::deserialize_from(BufReader::new(file))?;
        if artifact.classifier.n_features() != artifact.feature_names.len() {
            return Err(PipelineError::Serialization(format!(
                "artifact lists {} features but the classifier was fit on {}",
                artifact.feature_names.len(),
                artifact.classifier.n_features()
            )));
        }
        Ok(artifact)
    }
}
