//! Model training stage: search, refit, evaluate, persist

use super::lightgbm::LightGBMClassifier;
use super::metrics::EvaluationMetrics;
use super::model::ModelArtifact;
use crate::config::{ArtifactPaths, ModelTrainingConfig};
use crate::error::{PipelineError, Result};
use crate::optimizer::RandomizedSearch;
use crate::tracking::{ExperimentTracker, RunStatus};
use crate::utils::{DataLoader, Dataset};
use chrono::Utc;
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Summary of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingOutput {
    pub feature_names: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub cv_score: f64,
    pub metrics: EvaluationMetrics,
    pub run_id: Option<String>,
}

pub struct ModelTrainer {
    config: ModelTrainingConfig,
    target_column: String,
    paths: ArtifactPaths,
}

fn load_split(path: &Path, target: &str) -> Result<(Array2<f64>, Array1<i64>, Vec<String>)> {
    let df = DataLoader::new().load_csv(path)?;
    let data = Dataset::from_frame(&df)?;
    if data.n_rows() == 0 {
        return Err(PipelineError::DataShape(format!("{} has no rows", path.display())));
    }
    data.split_target(target)
}

impl ModelTrainer {
    pub fn new(config: ModelTrainingConfig, target_column: impl Into<String>, paths: ArtifactPaths) -> Self {
        Self {
            config,
            target_column: target_column.into(),
            paths,
        }
    }

    /// Train on the processed splits and write the model artifact.
    ///
    /// Tracking, when given, is best effort and never fails the run.
    pub fn run(&self, tracker: Option<&ExperimentTracker>) -> Result<TrainingOutput> {
        let start = Instant::now();
        self.config.validate()?;

        let (x_train, y_train, feature_names) =
            load_split(&self.paths.processed_train_file, &self.target_column)?;
        let (x_test, y_test, test_names) = load_split(&self.paths.processed_test_file, &self.target_column)?;
        if test_names != feature_names {
            return Err(PipelineError::DataShape(format!(
                "test features {:?} differ from train features {:?}",
                test_names, feature_names
            )));
        }
        info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            features = feature_names.len(),
            "Loaded processed data"
        );

        let study = RandomizedSearch::new(self.config.clone()).optimize(&x_train, &y_train)?;
        let best = study
            .best_trial()
            .ok_or_else(|| PipelineError::ModelFit("search produced no usable candidate".into()))?;

        let mut classifier = LightGBMClassifier::new(
            best.params
                .to_config(self.config.min_child_samples, self.config.random_state),
        );
        classifier.fit(&x_train, &y_train)?;

        let predictions = classifier.predict(&x_test)?;
        let metrics = EvaluationMetrics::compute(&y_test, &predictions);
        info!(
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1,
            "Evaluated model on test split"
        );

        let artifact = ModelArtifact {
            feature_names: feature_names.clone(),
            target_column: self.target_column.clone(),
            classifier,
            best_params: best.params.clone(),
            cv_score: best.value,
            metrics,
            trained_at: Utc::now(),
        };
        artifact.save(&self.paths.model_file)?;

        let run_id = tracker.map(|t| self.track(t, &artifact));

        info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            model = %self.paths.model_file.display(),
            "Model training finished"
        );

        Ok(TrainingOutput {
            feature_names,
            train_rows: x_train.nrows(),
            test_rows: x_test.nrows(),
            cv_score: best.value,
            metrics,
            run_id,
        })
    }

    fn track(&self, tracker: &ExperimentTracker, artifact: &ModelArtifact) -> String {
        let mut run = tracker.start_run();
        run.log_artifact(&self.paths.processed_train_file);
        run.log_artifact(&self.paths.processed_test_file);
        run.log_artifact(&self.paths.model_file);

        for (key, value) in artifact.best_params.as_pairs() {
            run.log_param(key, value);
        }
        run.log_param("cv", self.config.cv);
        run.log_param("scoring", self.config.scoring);
        run.log_metric("cv_score", artifact.cv_score);
        for (key, value) in artifact.metrics.as_pairs() {
            run.log_metric(key, value);
        }

        let finished = run.finish(RunStatus::Finished);
        if finished.artifacts.len() < 3 {
            warn!(run_id = %finished.run_id, "Tracking run is missing artifacts");
        }
        info!(run_id = %finished.run_id, experiment = tracker.experiment(), "Tracked training run");
        finished.run_id
    }
}
