//! Artifact file layout

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fixed file layout of every pipeline artifact, rooted at one directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub raw_dir: PathBuf,
    pub raw_file: PathBuf,
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    pub processed_dir: PathBuf,
    pub processed_train_file: PathBuf,
    pub processed_test_file: PathBuf,
    pub model_dir: PathBuf,
    pub model_file: PathBuf,
    pub tracking_dir: PathBuf,
}

impl ArtifactPaths {
    /// Build the layout under `root`
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let raw_dir = root.join("data_ingestion");
        let processed_dir = root.join("data_processed");
        let model_dir = root.join("model_training");

        Self {
            raw_file: raw_dir.join("raw.csv"),
            train_file: raw_dir.join("train.csv"),
            test_file: raw_dir.join("test.csv"),
            processed_train_file: processed_dir.join("processed_train.csv"),
            processed_test_file: processed_dir.join("processed_test.csv"),
            model_file: model_dir.join("lgbm.bin"),
            tracking_dir: root.join("tracking"),
            raw_dir,
            processed_dir,
            model_dir,
        }
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::under("artifacts")
    }
}
