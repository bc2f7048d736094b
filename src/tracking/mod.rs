//! Experiment tracking
//!
//! Optional record of each training run: parameters, held-out metrics and
//! copies of the datasets and model it produced.

mod storage;
mod tracker;

pub use storage::{LocalStorage, StorageBackend};
pub use tracker::{ActiveRun, ExperimentTracker, Run, RunStatus};
