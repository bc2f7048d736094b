//! Experiment tracker and run records

use super::storage::{LocalStorage, StorageBackend};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// One tracked training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub experiment: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    /// Stored artifact paths
    pub artifacts: Vec<String>,
}

impl Run {
    pub fn new(experiment: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            experiment: experiment.into(),
            started_at: Utc::now(),
            ended_at: None,
            status: RunStatus::Running,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
        }
    }
}

/// Records params, metrics and artifact copies for training runs
pub struct ExperimentTracker {
    experiment: String,
    storage: Box<dyn StorageBackend>,
}

impl ExperimentTracker {
    pub fn new(experiment: impl Into<String>, storage: Box<dyn StorageBackend>) -> Self {
        Self {
            experiment: experiment.into(),
            storage,
        }
    }

    /// Tracker writing under a local directory
    pub fn local(experiment: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self::new(experiment, Box::new(LocalStorage::new(dir)))
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    pub fn start_run(&self) -> ActiveRun<'_> {
        let run = Run::new(&self.experiment);
        debug!(run_id = %run.run_id, experiment = %self.experiment, "Started tracking run");
        ActiveRun { tracker: self, run }
    }

    pub fn runs(&self) -> Result<Vec<Run>> {
        self.storage.load_runs(&self.experiment)
    }
}

/// Run in progress. Logging never fails the caller: storage errors are
/// reported at `warn` and the run carries on.
pub struct ActiveRun<'a> {
    tracker: &'a ExperimentTracker,
    run: Run,
}

impl ActiveRun<'_> {
    pub fn run_id(&self) -> &str {
        &self.run.run_id
    }

    pub fn log_param(&mut self, key: impl Into<String>, value: impl ToString) {
        self.run.params.insert(key.into(), value.to_string());
    }

    pub fn log_metric(&mut self, key: impl Into<String>, value: f64) {
        self.run.metrics.insert(key.into(), value);
    }

    pub fn log_artifact(&mut self, path: &Path) {
        match self.tracker.storage.store_artifact(&self.run, path) {
            Ok(stored) => self.run.artifacts.push(stored.display().to_string()),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to log artifact"),
        }
    }

    /// Close the run and persist its record
    pub fn finish(mut self, status: RunStatus) -> Run {
        self.run.status = status;
        self.run.ended_at = Some(Utc::now());
        if let Err(e) = self.tracker.storage.save_run(&self.run) {
            warn!(run_id = %self.run.run_id, error = %e, "Failed to save tracking run");
        }
        self.run
    }
}
