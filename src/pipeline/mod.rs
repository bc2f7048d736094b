//! End-to-end training pipeline: ingestion, processing, training

use crate::config::{AppConfig, ArtifactPaths};
use crate::error::{PipelineError, Result, Stage};
use crate::ingestion::{store_from_config, DataIngestion, IngestionOutput, ObjectStore};
use crate::preprocessing::{DataProcessor, ProcessingOutput};
use crate::tracking::ExperimentTracker;
use crate::training::{ModelTrainer, TrainingOutput};
use serde::Serialize;
use std::time::Instant;
use tracing::{error, info};

/// Outcome of every stage of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub ingestion: IngestionOutput,
    pub processing: ProcessingOutput,
    pub training: TrainingOutput,
    pub elapsed_secs: f64,
}

/// Runs the three stages in order; the first failure stops the run and is
/// returned tagged with its stage.
pub struct TrainingPipeline {
    config: AppConfig,
    paths: ArtifactPaths,
    store: Option<Box<dyn ObjectStore>>,
}

impl TrainingPipeline {
    pub fn new(config: AppConfig) -> Self {
        let paths = config.artifact_paths();
        Self {
            config,
            paths,
            store: None,
        }
    }

    /// Use an explicit object store instead of the configured one
    pub fn with_store(mut self, store: Box<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Tracker for the training stage, when tracking is enabled
    pub fn tracker(&self) -> Option<ExperimentTracker> {
        let tracking = &self.config.model_training.tracking;
        tracking.enabled.then(|| {
            let dir = tracking
                .dir
                .clone()
                .unwrap_or_else(|| self.paths.tracking_dir.clone());
            ExperimentTracker::local(&tracking.experiment_name, dir)
        })
    }

    pub async fn run(&self) -> Result<PipelineReport> {
        let start = Instant::now();
        info!(artifacts = %self.paths.raw_dir.display(), "Starting training pipeline");

        let ingestion = self.ingest().await.map_err(|e| self.fail(e, Stage::Ingestion))?;
        let processing = self.process().map_err(|e| self.fail(e, Stage::Processing))?;
        let training = self.train().map_err(|e| self.fail(e, Stage::Training))?;

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(elapsed_secs, "Training pipeline completed successfully");
        Ok(PipelineReport {
            ingestion,
            processing,
            training,
            elapsed_secs,
        })
    }

    pub async fn ingest(&self) -> Result<IngestionOutput> {
        let stage = DataIngestion::new(self.config.data_ingestion.clone(), self.paths.clone());
        match &self.store {
            Some(store) => stage.run(store.as_ref()).await,
            None => {
                let store = store_from_config(&self.config.data_ingestion.storage)?;
                stage.run(store.as_ref()).await
            }
        }
    }

    pub fn process(&self) -> Result<ProcessingOutput> {
        DataProcessor::new(self.config.data_processing.clone(), self.paths.clone()).run()
    }

    pub fn train(&self) -> Result<TrainingOutput> {
        let tracker = self.tracker();
        ModelTrainer::new(
            self.config.model_training.clone(),
            self.config.data_processing.target_column.clone(),
            self.paths.clone(),
        )
        .run(tracker.as_ref())
    }

    fn fail(&self, err: PipelineError, stage: Stage) -> PipelineError {
        error!(stage = %stage, error = %err, "Pipeline stage failed");
        err.in_stage(stage)
    }
}
