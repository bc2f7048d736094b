//! Randomized hyperparameter search with stratified cross-validation

use super::search_space::{BoostParams, SearchSpace};
use crate::config::ModelTrainingConfig;
use crate::error::{PipelineError, Result};
use crate::training::{CVSplit, CVStrategy, CrossValidator, LightGBMClassifier};
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a single trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Trial number, in sampling order
    pub trial_id: usize,
    pub params: BoostParams,
    /// Mean score across folds
    pub value: f64,
    pub fold_scores: Vec<f64>,
    pub duration_secs: f64,
    /// Whether the trial failed to fit
    pub pruned: bool,
}

/// Study containing all trials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Study {
    pub trials: Vec<TrialResult>,
    pub best_trial_idx: Option<usize>,
    pub total_duration_secs: f64,
}

impl Study {
    pub fn new() -> Self {
        Self {
            trials: Vec::new(),
            best_trial_idx: None,
            total_duration_secs: 0.0,
        }
    }

    /// Get the best trial
    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.best_trial_idx.map(|idx| &self.trials[idx])
    }

    /// Get the best value
    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().map(|t| t.value)
    }

    /// Get the best parameters
    pub fn best_params(&self) -> Option<&BoostParams> {
        self.best_trial().map(|t| &t.params)
    }

    /// Add a trial result. Only a strictly higher score replaces the best, so ties keep the earlier trial.
    pub fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();
        let is_better = !result.pruned
            && self
                .best_value()
                .map_or(true, |best| result.value > best);

        if is_better {
            self.best_trial_idx = Some(idx);
        }
        self.trials.push(result);
    }
}

impl Default for Study {
    fn default() -> Self {
        Self::new()
    }
}

/// Randomized search over [`SearchSpace`]
pub struct RandomizedSearch {
    config: ModelTrainingConfig,
    search_space: SearchSpace,
}

impl RandomizedSearch {
    pub fn new(config: ModelTrainingConfig) -> Self {
        let search_space = SearchSpace::new(config.param_distributions.clone());
        Self {
            config,
            search_space,
        }
    }

    fn n_threads(&self) -> usize {
        if self.config.n_jobs > 0 {
            self.config.n_jobs as usize
        } else {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        }
    }

    fn evaluate(&self, params: &BoostParams, x: &Array2<f64>, y: &Array1<i64>, splits: &[CVSplit]) -> Result<Vec<f64>> {
        splits
            .iter()
            .map(|split| {
                let x_train = x.select(Axis(0), &split.train_indices);
                let y_train = y.select(Axis(0), &split.train_indices);
                let x_val = x.select(Axis(0), &split.test_indices);
                let y_val = y.select(Axis(0), &split.test_indices);

                let mut model = LightGBMClassifier::new(
                    params.to_config(self.config.min_child_samples, self.config.random_state),
                );
                model.fit(&x_train, &y_train)?;
                let preds = model.predict(&x_val)?;
                Ok(self.config.scoring.score(&y_val, &preds))
            })
            .collect()
    }

    /// Score every sampled candidate. Candidates run in parallel; results keep sampling order.
    pub fn optimize(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<Study> {
        let start = Instant::now();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let candidates = self.search_space.sample_n(self.config.n_iter, &mut rng);

        let splits = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: self.config.cv,
            shuffle: false,
        })
        .split(y)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_threads())
            .build()
            .map_err(|e| PipelineError::ModelFit(format!("failed to start search pool: {}", e)))?;

        info!(
            n_iter = self.config.n_iter,
            cv = self.config.cv,
            threads = pool.current_num_threads(),
            scoring = %self.config.scoring,
            "Starting randomized search"
        );

        let trials: Vec<TrialResult> = pool.install(|| {
            candidates
                .par_iter()
                .enumerate()
                .map(|(trial_id, params)| {
                    let trial_start = Instant::now();
                    match self.evaluate(params, x, y, &splits) {
                        Ok(fold_scores) => {
                            let value = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
                            debug!(trial_id, value, params = %params, "Trial finished");
                            TrialResult {
                                trial_id,
                                params: params.clone(),
                                value,
                                fold_scores,
                                duration_secs: trial_start.elapsed().as_secs_f64(),
                                pruned: false,
                            }
                        }
                        Err(e) => {
                            warn!(trial_id, error = %e, params = %params, "Trial failed");
                            TrialResult {
                                trial_id,
                                params: params.clone(),
                                value: f64::NEG_INFINITY,
                                fold_scores: Vec::new(),
                                duration_secs: trial_start.elapsed().as_secs_f64(),
                                pruned: true,
                            }
                        }
                    }
                })
                .collect()
        });

        let mut study = Study::new();
        for trial in trials {
            study.add_trial(trial);
        }
        study.total_duration_secs = start.elapsed().as_secs_f64();

        match study.best_trial() {
            Some(best) => {
                info!(
                    best_trial = best.trial_id,
                    best_score = best.value,
                    params = %best.params,
                    elapsed_secs = study.total_duration_secs,
                    "Randomized search finished"
                );
                Ok(study)
            }
            None => Err(PipelineError::ModelFit(
                "every search candidate failed to fit".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IntRange, ParamDistributions};
    use crate::training::BoostingType;

    fn trial(id: usize, value: f64, pruned: bool) -> TrialResult {
        TrialResult {
            trial_id: id,
            params: BoostParams {
                n_estimators: 10,
                max_depth: 3,
                learning_rate: 0.1,
                num_leaves: 4,
                boosting_type: BoostingType::Gbdt,
            },
            value,
            fold_scores: vec![value],
            duration_secs: 0.0,
            pruned,
        }
    }

    #[test]
    fn test_study_ties_keep_earliest() {
        let mut study = Study::new();
        study.add_trial(trial(0, 0.8, false));
        study.add_trial(trial(1, 0.9, false));
        study.add_trial(trial(2, 0.9, false));
        study.add_trial(trial(3, 1.0, true));
        assert_eq!(study.best_trial().unwrap().trial_id, 1);
    }

    fn small_config() -> ModelTrainingConfig {
        let mut config = ModelTrainingConfig::default().with_n_iter(3).with_cv(2);
        config.n_jobs = 2;
        config.min_child_samples = 2;
        config.param_distributions = ParamDistributions {
            n_estimators: IntRange { low: 5, high: 15 },
            max_depth: IntRange { low: 2, high: 5 },
            num_leaves: IntRange { low: 2, high: 8 },
            ..ParamDistributions::default()
        };
        config
    }

    fn separable() -> (Array2<f64>, Array1<i64>) {
        let x = Array2::from_shape_fn((60, 2), |(i, j)| (i as f64) + j as f64 * 0.5);
        let y = Array1::from_shape_fn(60, |i| if i % 2 == 0 && i >= 30 { 1 } else if i >= 40 { 1 } else { 0 });
        (x, y)
    }

    #[test]
    fn test_search_is_deterministic() {
        let (x, y) = separable();
        let a = RandomizedSearch::new(small_config()).optimize(&x, &y).unwrap();
        let b = RandomizedSearch::new(small_config()).optimize(&x, &y).unwrap();
        assert_eq!(a.trials.len(), 3);
        assert_eq!(a.best_params(), b.best_params());
        assert_eq!(a.best_value(), b.best_value());
    }

    #[test]
    fn test_search_fails_when_every_candidate_fails() {
        let (x, _) = separable();
        // The lone positive lands in fold 0, leaving that fold's training rows single-class
        let y = Array1::from_shape_fn(60, |i| if i == 0 { 1 } else { 0 });
        let err = RandomizedSearch::new(small_config()).optimize(&x, &y).unwrap_err();
        assert!(matches!(err, PipelineError::ModelFit(_)));
    }
}
