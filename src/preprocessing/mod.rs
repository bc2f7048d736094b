//! Data processing stage
//!
//! Turns the raw train/test splits into model-ready tables:
//! - Identifier columns dropped, duplicate rows removed
//! - Categorical columns label-encoded
//! - Skewed numeric columns log1p-transformed
//! - Classes balanced with SMOTE
//! - Top-K features chosen by random-forest importance

mod encoder;
pub mod feature_selection;
pub mod transforms;

pub use encoder::LabelEncoder;
pub use feature_selection::FeatureSelector;
pub use transforms::{skewness, SkewCorrector};

use crate::config::{ArtifactPaths, DataProcessingConfig};
use crate::error::Result;
use crate::synthetic::{class_counts, Sampler, SMOTE};
use crate::utils::{DataLoader, DataSaver, Dataset};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

/// Summary of a processing run
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutput {
    /// Chosen features, most important first
    pub selected_features: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Columns log1p-transformed in the train split
    pub skewed_columns: Vec<String>,
    /// Rows SMOTE added to the train split
    pub synthetic_rows: usize,
    /// Categories of each encoded column in code order, as fitted on train
    pub encodings: BTreeMap<String, Vec<String>>,
}

pub struct DataProcessor {
    config: DataProcessingConfig,
    paths: ArtifactPaths,
}

impl DataProcessor {
    pub fn new(config: DataProcessingConfig, paths: ArtifactPaths) -> Self {
        Self { config, paths }
    }

    pub fn run(&self) -> Result<ProcessingOutput> {
        let start = Instant::now();
        self.config.validate()?;

        let loader = DataLoader::new();
        let train = self.drop_columns(loader.load_csv(&self.paths.train_file)?);
        let test = self.drop_columns(loader.load_csv(&self.paths.test_file)?);
        info!(train_rows = train.height(), test_rows = test.height(), "Loaded raw splits");

        let (train, test, encodings) = self.encode(&train, &test)?;
        let mut train = self.clean(&train, "train")?;
        let mut test = self.clean(&test, "test")?;

        let corrector = SkewCorrector::new(self.config.skewness_threshold);
        let skewed_columns = corrector.apply(&mut train, &self.config.numerical_columns)?;
        let skewed_test = corrector.apply(&mut test, &self.config.numerical_columns)?;
        info!(train = ?skewed_columns, test = ?skewed_test, "Skew correction applied");

        let (train, synthetic_rows) = self.balance(&train)?;
        let test = if self.config.balance_test {
            self.balance(&test)?.0
        } else {
            test
        };

        let target = self.config.target_column.as_str();
        let (x_train, y_train, feature_names) = train.split_target(target)?;
        let mut selector = FeatureSelector::top_k(self.config.numerical_features_to_select)
            .with_estimators(self.config.selection_estimators)
            .with_random_state(self.config.random_state)
            .with_feature_names(feature_names);
        selector.fit(&x_train, &y_train)?;
        let selected_features = selector.selected_names().unwrap_or_default();
        info!(features = ?selected_features, "Selected features");

        let mut keep = selected_features.clone();
        keep.push(self.config.target_column.clone());
        let train = train.select(&keep)?;
        let test = test.select(&keep)?;

        let mut train_frame = train.to_frame(&[target])?;
        let mut test_frame = test.to_frame(&[target])?;
        DataSaver::save_csv(&mut train_frame, &self.paths.processed_train_file)?;
        DataSaver::save_csv(&mut test_frame, &self.paths.processed_test_file)?;

        info!(
            train_rows = train.n_rows(),
            test_rows = test.n_rows(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Data processing finished"
        );

        Ok(ProcessingOutput {
            selected_features,
            train_rows: train.n_rows(),
            test_rows: test.n_rows(),
            skewed_columns,
            synthetic_rows,
            encodings,
        })
    }

    fn drop_columns(&self, mut df: DataFrame) -> DataFrame {
        for name in &self.config.drop_columns {
            match df.drop_in_place(name) {
                Ok(_) => debug!(column = %name, "Dropped column"),
                Err(_) => debug!(column = %name, "Column to drop not present"),
            }
        }
        df
    }

    fn encode(
        &self,
        train: &DataFrame,
        test: &DataFrame,
    ) -> Result<(DataFrame, DataFrame, BTreeMap<String, Vec<String>>)> {
        let columns = &self.config.categorical_columns;
        let mut encoder = LabelEncoder::new();
        let train = encoder.fit_transform(train, columns)?;
        let encodings: BTreeMap<String, Vec<String>> = columns
            .iter()
            .filter_map(|c| encoder.categories(c).map(|cats| (c.clone(), cats.to_vec())))
            .collect();
        for (column, categories) in &encodings {
            debug!(column = %column, categories = ?categories, "Fitted label encoding");
        }

        let test = if self.config.share_encoders {
            encoder.transform(test)?
        } else {
            LabelEncoder::new().fit_transform(test, columns)?
        };
        Ok((train, test, encodings))
    }

    fn clean(&self, df: &DataFrame, split: &str) -> Result<Dataset> {
        let mut data = Dataset::from_frame(df)?;
        let removed = data.drop_duplicates();
        if removed > 0 {
            info!(split, removed, "Dropped duplicate rows");
        }
        Ok(data)
    }

    fn balance(&self, data: &Dataset) -> Result<(Dataset, usize)> {
        let target = self.config.target_column.as_str();
        let (x, y, names) = data.split_target(target)?;
        let before = class_counts(&y);

        let mut smote = SMOTE::new()
            .with_k_neighbors(self.config.smote_k_neighbors)
            .with_seed(self.config.random_state);
        let result = smote.fit_resample(&x, &y)?;
        let added: usize = result.n_synthetic.iter().sum();
        info!(before = ?before, after = ?class_counts(&result.y), added, "Balanced classes");

        Ok((Dataset::from_parts(names, result.x, target, &result.y)?, added))
    }
}
