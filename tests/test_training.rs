//! Integration test: model training on processed data

mod common;

use hotel_reservation::config::{AppConfig, ArtifactPaths, TARGET_COLUMN};
use hotel_reservation::error::PipelineError;
use hotel_reservation::ingestion::{DataIngestion, LocalStore};
use hotel_reservation::optimizer::RandomizedSearch;
use hotel_reservation::preprocessing::DataProcessor;
use hotel_reservation::tracking::{ExperimentTracker, RunStatus};
use hotel_reservation::training::{ModelArtifact, ModelTrainer};
use hotel_reservation::utils::{DataLoader, DataSaver, Dataset};
use tempfile::{tempdir, TempDir};

struct Workspace {
    _bucket: TempDir,
    out: TempDir,
    config: AppConfig,
    paths: ArtifactPaths,
}

async fn processed(rows: usize) -> Workspace {
    let bucket = tempdir().unwrap();
    let out = tempdir().unwrap();
    common::seed_bucket(bucket.path(), rows);
    let config = common::app_config(bucket.path(), out.path());
    let paths = config.artifact_paths();
    DataIngestion::new(config.data_ingestion.clone(), paths.clone())
        .run(&LocalStore::new(bucket.path()))
        .await
        .unwrap();
    DataProcessor::new(config.data_processing.clone(), paths.clone())
        .run()
        .unwrap();
    Workspace {
        _bucket: bucket,
        out,
        config,
        paths,
    }
}

fn trainer(ws: &Workspace) -> ModelTrainer {
    ModelTrainer::new(ws.config.model_training.clone(), TARGET_COLUMN, ws.paths.clone())
}

#[tokio::test]
async fn test_training_writes_loadable_artifact() {
    let ws = processed(200).await;
    let output = trainer(&ws).run(None).unwrap();

    assert_eq!(output.feature_names.len(), 10);
    assert!(output.run_id.is_none());
    for (_, value) in output.metrics.as_pairs() {
        assert!((0.0..=1.0).contains(&value));
    }

    let artifact = ModelArtifact::load(&ws.paths.model_file).unwrap();
    assert_eq!(artifact.feature_names, output.feature_names);
    assert_eq!(artifact.target_column, TARGET_COLUMN);
    assert_eq!(artifact.metrics, output.metrics);

    let test = Dataset::from_frame(&DataLoader::new().load_csv(&ws.paths.processed_test_file).unwrap()).unwrap();
    let (x_test, _, _) = test.split_target(TARGET_COLUMN).unwrap();
    let predictions = artifact.predict(&x_test).unwrap();
    assert_eq!(predictions.len(), x_test.nrows());
    assert!(predictions.iter().all(|&p| p == 0 || p == 1));
}

#[tokio::test]
async fn test_search_is_deterministic() {
    let ws = processed(160).await;
    let train = Dataset::from_frame(&DataLoader::new().load_csv(&ws.paths.processed_train_file).unwrap()).unwrap();
    let (x, y, _) = train.split_target(TARGET_COLUMN).unwrap();

    let search = RandomizedSearch::new(ws.config.model_training.clone());
    let a = search.optimize(&x, &y).unwrap();
    let b = search.optimize(&x, &y).unwrap();
    assert_eq!(a.trials.len(), 2);
    assert_eq!(a.best_params(), b.best_params());
    assert_eq!(a.best_value(), b.best_value());
}

#[tokio::test]
async fn test_tracking_records_run() {
    let ws = processed(160).await;
    let tracker = ExperimentTracker::local("hotel-test", ws.out.path().join("runs"));
    let output = trainer(&ws).run(Some(&tracker)).unwrap();

    let run_id = output.run_id.unwrap();
    let runs = tracker.runs().unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.run_id, run_id);
    assert_eq!(run.status, RunStatus::Finished);
    assert_eq!(run.artifacts.len(), 3);
    assert!(run.params.contains_key("n_estimators"));
    assert_eq!(run.params["scoring"], "f1");
    assert!(run.metrics.contains_key("accuracy"));
    assert!(run.metrics.contains_key("cv_score"));
}

#[tokio::test]
async fn test_single_class_target_fails_fit() {
    let ws = processed(120).await;
    let mut train = DataLoader::new().load_csv(&ws.paths.processed_train_file).unwrap();
    let n = train.height();
    train
        .with_column(polars::prelude::Column::new(TARGET_COLUMN.into(), vec![1i64; n]))
        .unwrap();
    DataSaver::save_csv(&mut train, &ws.paths.processed_train_file).unwrap();

    let err = trainer(&ws).run(None).unwrap_err();
    assert!(matches!(err, PipelineError::ModelFit(_) | PipelineError::DataShape(_)));
    assert!(!ws.paths.model_file.exists());
}

#[test]
fn test_missing_processed_data() {
    let out = tempdir().unwrap();
    let config = AppConfig::from_yaml_str(&common::config_yaml(out.path(), out.path())).unwrap();
    let err = ModelTrainer::new(config.model_training.clone(), TARGET_COLUMN, config.artifact_paths())
        .run(None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
}
