//! Hyperparameter optimization
//!
//! Randomized search: candidates are drawn from independent per-parameter
//! distributions, scored with stratified k-fold, and ranked by mean score.

mod optimizer;
mod search_space;

pub use optimizer::{RandomizedSearch, Study, TrialResult};
pub use search_space::{BoostParams, SearchSpace};
