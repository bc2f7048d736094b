//! Search space for the boosted-tree hyperparameters

use crate::config::{FloatRange, IntRange, ParamDistributions};
use crate::training::{BoostingType, LightGBMConfig};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One sampled candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub num_leaves: usize,
    pub boosting_type: BoostingType,
}

impl BoostParams {
    /// Classifier config for this candidate
    pub fn to_config(&self, min_child_samples: usize, random_state: u64) -> LightGBMConfig {
        LightGBMConfig::default()
            .with_n_estimators(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_learning_rate(self.learning_rate)
            .with_num_leaves(self.num_leaves)
            .with_boosting_type(self.boosting_type)
            .with_min_child_samples(min_child_samples)
            .with_random_state(random_state)
    }

    /// Flat name/value pairs for logging and tracking
    pub fn as_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("n_estimators", self.n_estimators.to_string()),
            ("max_depth", self.max_depth.to_string()),
            ("learning_rate", format!("{:.6}", self.learning_rate)),
            ("num_leaves", self.num_leaves.to_string()),
            ("boosting_type", self.boosting_type.to_string()),
        ]
    }
}

impl fmt::Display for BoostParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .as_pairs()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

fn sample_int(range: IntRange, rng: &mut impl Rng) -> usize {
    // Upper bound is exclusive
    rng.gen_range(range.low..range.high).max(1) as usize
}

fn sample_float(range: FloatRange, rng: &mut impl Rng) -> f64 {
    range.low + rng.gen::<f64>() * range.width
}

/// Independent distributions for every hyperparameter
#[derive(Debug, Clone)]
pub struct SearchSpace {
    distributions: ParamDistributions,
}

impl SearchSpace {
    pub fn new(distributions: ParamDistributions) -> Self {
        Self { distributions }
    }

    /// Draw one candidate
    pub fn sample(&self, rng: &mut impl Rng) -> BoostParams {
        let d = &self.distributions;
        BoostParams {
            n_estimators: sample_int(d.n_estimators, rng),
            max_depth: sample_int(d.max_depth, rng),
            learning_rate: sample_float(d.learning_rate, rng),
            num_leaves: sample_int(d.num_leaves, rng),
            boosting_type: *d.boosting_type.choose(rng).unwrap_or(&BoostingType::Gbdt),
        }
    }

    /// Draw `n` candidates in order
    pub fn sample_n(&self, n: usize, rng: &mut impl Rng) -> Vec<BoostParams> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}
