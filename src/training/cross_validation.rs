//! Cross-validation splitters

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-validation strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold {
            n_splits: 5,
            shuffle: false,
        }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: u64,
}

/// Sizes of `n_splits` near-equal chunks of `n`, larger chunks first
fn fold_sizes(n: usize, n_splits: usize) -> impl Iterator<Item = usize> {
    let base = n / n_splits;
    let remainder = n % n_splits;
    (0..n_splits).map(move |i| if i < remainder { base + 1 } else { base })
}

impl CrossValidator {
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: 42,
        }
    }

    /// Set random state used when shuffling
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Generate train/test splits over `y.len()` rows
    pub fn split(&self, y: &Array1<i64>) -> Result<Vec<CVSplit>> {
        let (n_splits, shuffle) = match self.strategy {
            CVStrategy::KFold { n_splits, shuffle } | CVStrategy::StratifiedKFold { n_splits, shuffle } => {
                (n_splits, shuffle)
            }
        };
        let n_samples = y.len();
        if n_splits < 2 {
            return Err(PipelineError::Validation("n_splits must be at least 2".into()));
        }
        if n_samples < n_splits {
            return Err(PipelineError::Validation(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut fold_of = vec![0usize; n_samples];

        match self.strategy {
            CVStrategy::KFold { .. } => {
                let mut indices: Vec<usize> = (0..n_samples).collect();
                if shuffle {
                    indices.shuffle(&mut rng);
                }
                let mut current = 0;
                for (fold, size) in fold_sizes(n_samples, n_splits).enumerate() {
                    for &i in &indices[current..current + size] {
                        fold_of[i] = fold;
                    }
                    current += size;
                }
            }
            CVStrategy::StratifiedKFold { .. } => {
                let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
                for (idx, &label) in y.iter().enumerate() {
                    by_class.entry(label).or_default().push(idx);
                }
                // Each class is cut into contiguous near-equal chunks, one per fold
                for indices in by_class.values_mut() {
                    if shuffle {
                        indices.shuffle(&mut rng);
                    }
                    let mut current = 0;
                    for (fold, size) in fold_sizes(indices.len(), n_splits).enumerate() {
                        for &i in &indices[current..current + size] {
                            fold_of[i] = fold;
                        }
                        current += size;
                    }
                }
            }
        }

        let splits = (0..n_splits)
            .map(|fold_idx| {
                let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                    (0..n_samples).partition(|&i| fold_of[i] == fold_idx);
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect::<Vec<_>>();

        if let Some(empty) = splits.iter().find(|s| s.test_indices.is_empty()) {
            return Err(PipelineError::Validation(format!(
                "fold {} has no test rows",
                empty.fold_idx
            )));
        }
        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_kfold_covers_every_row_once() {
        let y = Array1::from_vec(vec![0i64; 10]);
        let cv = CrossValidator::new(CVStrategy::KFold {
            n_splits: 3,
            shuffle: true,
        });
        let splits = cv.split(&y).unwrap();
        assert_eq!(splits.len(), 3);

        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(splits[0].test_indices.len(), 4);
        for s in &splits {
            assert_eq!(s.train_indices.len() + s.test_indices.len(), 10);
        }
    }

    #[test]
    fn test_stratified_preserves_class_ratio() {
        let y = array![0, 0, 0, 0, 1, 1, 0, 0, 1, 1];
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: 2,
            shuffle: false,
        });
        let splits = cv.split(&y).unwrap();
        for s in &splits {
            let positives = s.test_indices.iter().filter(|&&i| y[i] == 1).count();
            assert_eq!(positives, 2);
            assert_eq!(s.test_indices.len(), 5);
        }
        // Unshuffled: the first chunk of each class lands in fold 0
        assert_eq!(splits[0].test_indices, vec![0, 1, 2, 4, 5]);
    }

    #[test]
    fn test_too_few_rows() {
        let y = array![0, 1];
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: 3,
            shuffle: false,
        });
        assert!(cv.split(&y).is_err());
    }
}
