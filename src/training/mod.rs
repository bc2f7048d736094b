//! Model training module
//!
//! Provides the learners and evaluation used by the pipeline:
//! - Gini decision trees and random forests (feature ranking)
//! - LightGBM-style gradient boosting (the deployed classifier)
//! - Stratified cross-validation and classification metrics
//! - The training stage and its persisted artifact

pub mod cross_validation;
pub mod decision_tree;
pub mod lightgbm;
mod metrics;
mod model;
pub mod random_forest;
mod trainer;

pub use cross_validation::{CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::DecisionTree;
pub use lightgbm::{BoostingType, LightGBMClassifier, LightGBMConfig};
pub use metrics::{EvaluationMetrics, Scoring, POSITIVE_LABEL};
pub use model::ModelArtifact;
pub use random_forest::{MaxFeatures, RandomForest};
pub use trainer::{ModelTrainer, TrainingOutput};
