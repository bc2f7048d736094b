//! Pipeline configuration
//!
//! The YAML file mirrors the stage layout: `DataIngestion`, `DataProcessing`,
//! `ModelTraining`, plus `Paths` and `Server`. Everything except the two data
//! sections has defaults.

mod paths;

pub use paths::ArtifactPaths;

use crate::error::{PipelineError, Result};
use crate::training::{BoostingType, Scoring};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default config location relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Target column of the hotel reservations dataset
pub const TARGET_COLUMN: &str = "booking_status";

/// Full application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "DataIngestion")]
    pub data_ingestion: DataIngestionConfig,

    #[serde(rename = "DataProcessing")]
    pub data_processing: DataProcessingConfig,

    #[serde(rename = "ModelTraining", default)]
    pub model_training: ModelTrainingConfig,

    #[serde(rename = "Paths", default)]
    pub paths: PathsConfig,

    #[serde(rename = "Server", default)]
    pub server: ServerSection,
}

impl AppConfig {
    /// Read and validate a YAML config file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Artifact layout derived from `Paths.artifacts_dir`
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::under(&self.paths.artifacts_dir)
    }

    pub fn validate(&self) -> Result<()> {
        self.data_ingestion.validate()?;
        self.data_processing.validate()?;
        self.model_training.validate()
    }
}

/// Where the raw object is fetched from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Google Cloud Storage JSON API
    Gcs {
        #[serde(default = "default_gcs_endpoint")]
        endpoint: String,
    },
    /// Directory laid out as `{root}/{bucket}/{object}`
    Local { root: PathBuf },
}

fn default_gcs_endpoint() -> String {
    "https://storage.googleapis.com".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Gcs {
            endpoint: default_gcs_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataIngestionConfig {
    pub bucket_name: String,
    pub bucket_file_name: String,
    pub train_ratio: f64,
    #[serde(default = "default_seed")]
    pub random_state: u64,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl DataIngestionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bucket_name.trim().is_empty() {
            return Err(PipelineError::Validation("bucket_name must not be empty".into()));
        }
        if self.bucket_file_name.trim().is_empty() {
            return Err(PipelineError::Validation("bucket_file_name must not be empty".into()));
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(PipelineError::Validation(format!(
                "train_ratio must be in (0, 1), got {}",
                self.train_ratio
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataProcessingConfig {
    pub categorical_columns: Vec<String>,
    pub numerical_columns: Vec<String>,
    pub skewness_threshold: f64,
    pub numerical_features_to_select: usize,
    #[serde(default = "default_target")]
    pub target_column: String,
    #[serde(default = "default_drop_columns")]
    pub drop_columns: Vec<String>,
    /// Fit label encoders on train and reuse them for test
    #[serde(default = "default_true")]
    pub share_encoders: bool,
    /// Also oversample the test split
    #[serde(default)]
    pub balance_test: bool,
    #[serde(default = "default_selection_estimators")]
    pub selection_estimators: usize,
    #[serde(default = "default_smote_neighbors")]
    pub smote_k_neighbors: usize,
    #[serde(default = "default_seed")]
    pub random_state: u64,
}

fn default_target() -> String {
    TARGET_COLUMN.to_string()
}

fn default_drop_columns() -> Vec<String> {
    vec!["Unnamed: 0".to_string(), "Booking_ID".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_selection_estimators() -> usize {
    100
}

fn default_smote_neighbors() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

impl DataProcessingConfig {
    /// Builder method to set the number of selected features
    pub fn with_features_to_select(mut self, k: usize) -> Self {
        self.numerical_features_to_select = k;
        self
    }

    /// Builder method to toggle encoder sharing between splits
    pub fn with_shared_encoders(mut self, share: bool) -> Self {
        self.share_encoders = share;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.numerical_features_to_select == 0 {
            return Err(PipelineError::Validation(
                "numerical_features_to_select must be at least 1".into(),
            ));
        }
        if self.target_column.is_empty() {
            return Err(PipelineError::Validation("target_column must not be empty".into()));
        }
        if self.numerical_columns.contains(&self.target_column) {
            return Err(PipelineError::Validation(format!(
                "target column {} cannot be skew-corrected",
                self.target_column
            )));
        }
        if self.selection_estimators == 0 {
            return Err(PipelineError::Validation("selection_estimators must be at least 1".into()));
        }
        Ok(())
    }
}

/// Inclusive-exclusive integer range, sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: i64,
    pub high: i64,
}

/// Uniform float range `[low, low + width)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub low: f64,
    pub width: f64,
}

/// Hyperparameter distributions for the boosted-tree search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDistributions {
    pub n_estimators: IntRange,
    pub max_depth: IntRange,
    pub learning_rate: FloatRange,
    pub num_leaves: IntRange,
    pub boosting_type: Vec<BoostingType>,
}

impl Default for ParamDistributions {
    fn default() -> Self {
        Self {
            n_estimators: IntRange { low: 100, high: 500 },
            max_depth: IntRange { low: 5, high: 50 },
            learning_rate: FloatRange { low: 0.01, width: 0.2 },
            num_leaves: IntRange { low: 20, high: 100 },
            boosting_type: vec![BoostingType::Gbdt, BoostingType::Goss],
        }
    }
}

/// Experiment tracking sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_experiment")]
    pub experiment_name: String,
    /// Overrides `<artifacts_dir>/tracking`
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_experiment() -> String {
    "hotel-reservation".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTrainingConfig {
    pub n_iter: usize,
    pub cv: usize,
    /// Worker threads for the search; -1 uses every core
    pub n_jobs: i32,
    pub scoring: Scoring,
    pub random_state: u64,
    pub min_child_samples: usize,
    pub param_distributions: ParamDistributions,
    pub tracking: TrackingConfig,
}

impl Default for ModelTrainingConfig {
    fn default() -> Self {
        Self {
            n_iter: 4,
            cv: 2,
            n_jobs: -1,
            scoring: Scoring::Accuracy,
            random_state: 42,
            min_child_samples: 20,
            param_distributions: ParamDistributions::default(),
            tracking: TrackingConfig {
                enabled: false,
                experiment_name: default_experiment(),
                dir: None,
            },
        }
    }
}

impl ModelTrainingConfig {
    /// Builder method to set the number of sampled candidates
    pub fn with_n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    /// Builder method to set the fold count
    pub fn with_cv(mut self, folds: usize) -> Self {
        self.cv = folds;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_iter == 0 {
            return Err(PipelineError::Validation("n_iter must be at least 1".into()));
        }
        if self.cv < 2 {
            return Err(PipelineError::Validation(format!("cv must be at least 2, got {}", self.cv)));
        }
        if self.n_jobs == 0 || self.n_jobs < -1 {
            return Err(PipelineError::Validation(format!(
                "n_jobs must be -1 or positive, got {}",
                self.n_jobs
            )));
        }
        let dist = &self.param_distributions;
        for (name, range) in [
            ("n_estimators", dist.n_estimators),
            ("max_depth", dist.max_depth),
            ("num_leaves", dist.num_leaves),
        ] {
            if range.low < 1 || range.high <= range.low {
                return Err(PipelineError::Validation(format!(
                    "{} range [{}, {}) is empty or non-positive",
                    name, range.low, range.high
                )));
            }
        }
        if dist.num_leaves.low < 2 {
            return Err(PipelineError::Validation("num_leaves must start at 2 or more".into()));
        }
        if dist.learning_rate.low <= 0.0 || dist.learning_rate.width < 0.0 {
            return Err(PipelineError::Validation("learning_rate range must be positive".into()));
        }
        if dist.boosting_type.is_empty() {
            return Err(PipelineError::Validation("boosting_type needs at least one choice".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub artifacts_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("artifacts"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}
