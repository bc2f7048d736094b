//! Hotel booking cancellation prediction
//!
//! An offline training pipeline and a small prediction server:
//!
//! - [`ingestion`] - Raw data download from object storage and seeded train/test split
//! - [`preprocessing`] - Cleaning, label encoding, skew correction, balancing, feature selection
//! - [`training`] - LightGBM-style booster, random forest ranking, metrics, model artifact
//! - [`optimizer`] - Randomized hyperparameter search with cross-validation
//! - [`synthetic`] - SMOTE oversampling
//! - [`tracking`] - Optional experiment tracking
//! - [`pipeline`] - Ingestion → processing → training orchestration
//! - [`server`] - Booking form and prediction endpoint
//! - [`cli`] - Command-line interface

// Core error handling and configuration
pub mod error;
pub mod config;

// Pipeline stages
pub mod ingestion;
pub mod preprocessing;
pub mod training;
pub mod pipeline;

// Supporting ML modules
pub mod optimizer;
pub mod synthetic;
pub mod tracking;
pub mod utils;

// Services
pub mod server;
pub mod cli;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{AppConfig, ArtifactPaths};
    pub use crate::error::{PipelineError, Result, Stage};
    pub use crate::ingestion::{DataIngestion, LocalStore, ObjectStore};
    pub use crate::pipeline::{PipelineReport, TrainingPipeline};
    pub use crate::preprocessing::DataProcessor;
    pub use crate::training::{ModelArtifact, ModelTrainer};
}
