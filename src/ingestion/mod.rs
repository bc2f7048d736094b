//! Data ingestion stage
//!
//! Downloads the raw reservations table from object storage and splits it
//! into train and test CSVs.

mod split;
mod storage;

pub use split::{test_size, train_test_split};
pub use storage::{store_from_config, GcsStore, LocalStore, ObjectStore, ACCESS_TOKEN_ENV};

use crate::config::{ArtifactPaths, DataIngestionConfig};
use crate::error::Result;
use crate::utils::{DataLoader, DataSaver};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Row counts of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestionOutput {
    pub raw_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

pub struct DataIngestion {
    config: DataIngestionConfig,
    paths: ArtifactPaths,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig, paths: ArtifactPaths) -> Self {
        Self { config, paths }
    }

    /// Fetch the raw object through `store`, then write the seeded split
    pub async fn run(&self, store: &dyn ObjectStore) -> Result<IngestionOutput> {
        let start = Instant::now();
        self.config.validate()?;
        tokio::fs::create_dir_all(&self.paths.raw_dir).await?;

        info!(
            store = store.name(),
            bucket = %self.config.bucket_name,
            object = %self.config.bucket_file_name,
            "Downloading raw data"
        );
        store
            .download(
                &self.config.bucket_name,
                &self.config.bucket_file_name,
                &self.paths.raw_file,
            )
            .await?;

        let raw = DataLoader::new().load_csv(&self.paths.raw_file)?;
        let (mut train, mut test) =
            train_test_split(&raw, self.config.train_ratio, self.config.random_state)?;
        DataSaver::save_csv(&mut train, &self.paths.train_file)?;
        DataSaver::save_csv(&mut test, &self.paths.test_file)?;

        let output = IngestionOutput {
            raw_rows: raw.height(),
            train_rows: train.height(),
            test_rows: test.height(),
        };
        info!(
            raw_rows = output.raw_rows,
            train_rows = output.train_rows,
            test_rows = output.test_rows,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Data ingestion finished"
        );
        Ok(output)
    }
}
