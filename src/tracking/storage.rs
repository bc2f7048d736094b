//! Storage backend for experiment tracking
//!
//! Layout: `{base}/{experiment}/{run_id}/run.json` with logged files under
//! `{base}/{experiment}/{run_id}/artifacts/`.

use super::tracker::Run;
use crate::error::{PipelineError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Storage backend trait
pub trait StorageBackend: Send + Sync {
    /// Persist a run record, replacing any earlier version
    fn save_run(&self, run: &Run) -> Result<()>;

    /// Load every run recorded for `experiment`, oldest first
    fn load_runs(&self, experiment: &str) -> Result<Vec<Run>>;

    /// Copy `source` into the run's artifact area; returns the stored path
    fn store_artifact(&self, run: &Run, source: &Path) -> Result<PathBuf>;
}

/// Local file system storage backend
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn run_dir(&self, run: &Run) -> PathBuf {
        self.base_dir.join(&run.experiment).join(&run.run_id)
    }
}

impl StorageBackend for LocalStorage {
    fn save_run(&self, run: &Run) -> Result<()> {
        let dir = self.run_dir(run);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(run)?;
        fs::write(dir.join("run.json"), json)?;
        Ok(())
    }

    fn load_runs(&self, experiment: &str) -> Result<Vec<Run>> {
        let exp_dir = self.base_dir.join(experiment);
        if !exp_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&exp_dir)? {
            let path = entry?.path().join("run.json");
            if path.is_file() {
                let run: Run = serde_json::from_str(&fs::read_to_string(&path)?)?;
                runs.push(run);
            }
        }
        runs.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(runs)
    }

    fn store_artifact(&self, run: &Run, source: &Path) -> Result<PathBuf> {
        let name = source.file_name().ok_or_else(|| {
            PipelineError::Validation(format!("artifact path {} has no file name", source.display()))
        })?;
        let dir = self.run_dir(run).join("artifacts");
        fs::create_dir_all(&dir)?;
        let dest = dir.join(name);
        fs::copy(source, &dest)?;
        Ok(dest)
    }
}
