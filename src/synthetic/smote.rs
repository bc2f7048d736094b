//! SMOTE (Synthetic Minority Over-sampling Technique)

use crate::error::{PipelineError, Result};
use crate::synthetic::{class_counts, class_indices, ResampleResult, Sampler};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// Distance/index pair for BinaryHeap-based partial sort; ties order by index
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Oversamples every non-majority class up to the majority count by
/// interpolating between a row and one of its k nearest same-class neighbours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SMOTE {
    /// Number of nearest neighbors
    k_neighbors: usize,
    /// Random seed
    seed: u64,
    /// Target samples per class
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl SMOTE {
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
            target_counts: None,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powi(2)).sum()
    }

    /// k nearest rows to `rows[point]` among `rows`, excluding the point itself.
    /// Exact duplicates of the point are valid neighbours.
    fn find_neighbors(x: &Array2<f64>, rows: &[usize], point: usize, k: usize) -> Vec<usize> {
        let target = x.row(rows[point]);
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);

        for (pos, &row) in rows.iter().enumerate() {
            if pos == point {
                continue;
            }
            let cand = DistIdx(Self::squared_distance(target, x.row(row)), pos);
            if heap.len() < k {
                heap.push(cand);
            } else if heap.peek().map_or(false, |worst| cand < *worst) {
                heap.pop();
                heap.push(cand);
            }
        }

        heap.into_sorted_vec().into_iter().map(|DistIdx(_, pos)| pos).collect()
    }
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SMOTE {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let counts = class_counts(y);
        if counts.len() < 2 {
            return Err(PipelineError::DataShape(format!(
                "SMOTE needs at least 2 classes, found {}",
                counts.len()
            )));
        }
        if let Some((class, _)) = counts.iter().find(|(_, &n)| n < 2) {
            return Err(PipelineError::DataShape(format!(
                "class {} has a single row, SMOTE needs at least 2",
                class
            )));
        }

        let max_count = counts.values().copied().max().unwrap_or(0);
        self.target_counts = Some(counts.keys().map(|&class| (class, max_count)).collect());
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let targets = self
            .target_counts
            .as_ref()
            .ok_or_else(|| PipelineError::Validation("SMOTE is not fitted".to_string()))?;
        if x.nrows() != y.len() {
            return Err(PipelineError::DataShape(format!(
                "{} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let indices = class_indices(y);
        let n_features = x.ncols();

        let mut synthetic_x: Vec<f64> = Vec::new();
        let mut synthetic_y: Vec<i64> = Vec::new();
        let mut n_synthetic = Vec::with_capacity(targets.len());

        for (&class, &target_count) in targets {
            let rows = match indices.get(&class) {
                Some(rows) => rows,
                None => {
                    n_synthetic.push(0);
                    continue;
                }
            };
            let n_to_generate = target_count.saturating_sub(rows.len());
            n_synthetic.push(n_to_generate);
            if n_to_generate == 0 {
                continue;
            }

            let k = self.k_neighbors.min(rows.len() - 1);
            let neighbors: Vec<Vec<usize>> = (0..rows.len())
                .into_par_iter()
                .map(|pos| Self::find_neighbors(x, rows, pos, k))
                .collect();

            for _ in 0..n_to_generate {
                let pos = rng.gen_range(0..rows.len());
                let nn = &neighbors[pos];
                let neighbor = nn[rng.gen_range(0..nn.len())];
                let gap: f64 = rng.gen();

                let base = x.row(rows[pos]);
                let other = x.row(rows[neighbor]);
                synthetic_x.extend(base.iter().zip(other.iter()).map(|(&p, &n)| p + gap * (n - p)));
                synthetic_y.push(class);
            }
        }

        // Original rows first, synthetic rows appended
        let n_original = x.nrows();
        let n_total = n_original + synthetic_y.len();
        let result_x = Array2::from_shape_fn((n_total, n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic_x[(i - n_original) * n_features + j]
            }
        });

        let mut all_y = y.to_vec();
        all_y.extend_from_slice(&synthetic_y);

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_imbalanced_data() -> (Array2<f64>, Array1<i64>) {
        let mut x_data = Vec::new();
        let mut y_data = Vec::new();

        for i in 0..100 {
            x_data.push(i as f64 * 0.1);
            x_data.push(i as f64 * 0.2);
            y_data.push(0);
        }
        for i in 0..10 {
            x_data.push(10.0 + i as f64 * 0.1);
            x_data.push(20.0 + i as f64 * 0.2);
            y_data.push(1);
        }

        (
            Array2::from_shape_vec((110, 2), x_data).unwrap(),
            Array1::from_vec(y_data),
        )
    }

    #[test]
    fn test_smote_balances_classes() {
        let (x, y) = create_imbalanced_data();
        let result = SMOTE::new().with_k_neighbors(3).fit_resample(&x, &y).unwrap();

        let counts = class_counts(&result.y);
        assert_eq!(counts[&0], 100);
        assert_eq!(counts[&1], 100);
        assert_eq!(result.n_synthetic, vec![0, 90]);
        assert_eq!(result.x.nrows(), 200);
    }

    #[test]
    fn test_originals_first_and_synthetic_within_hull() {
        let (x, y) = create_imbalanced_data();
        let result = SMOTE::new().fit_resample(&x, &y).unwrap();

        assert_eq!(result.x.slice(ndarray::s![..110, ..]), x);
        for row in result.x.slice(ndarray::s![110.., ..]).rows() {
            assert!(row[0] >= 10.0 - 1e-9 && row[0] <= 10.9 + 1e-9);
        }
    }

    #[test]
    fn test_seeded_output_is_reproducible() {
        let (x, y) = create_imbalanced_data();
        let a = SMOTE::new().with_seed(7).fit_resample(&x, &y).unwrap();
        let b = SMOTE::new().with_seed(7).fit_resample(&x, &y).unwrap();
        assert_eq!(a.x, b.x);
    }

    #[test]
    fn test_duplicate_minority_rows_do_not_hang() {
        let x = Array2::from_shape_vec((5, 1), vec![0.0, 1.0, 2.0, 5.0, 5.0]).unwrap();
        let y = Array1::from_vec(vec![0, 0, 0, 1, 1]);
        let result = SMOTE::new().fit_resample(&x, &y).unwrap();
        assert_eq!(result.x.nrows(), 6);
        assert_eq!(result.x[[5, 0]], 5.0);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = Array2::zeros((4, 2));
        let y = Array1::from_vec(vec![1, 1, 1, 1]);
        let err = SMOTE::new().fit_resample(&x, &y).unwrap_err();
        assert!(matches!(err, PipelineError::DataShape(_)));
    }

    #[test]
    fn test_singleton_class_rejected() {
        let x = Array2::zeros((4, 2));
        let y = Array1::from_vec(vec![0, 0, 0, 1]);
        assert!(SMOTE::new().fit_resample(&x, &y).is_err());
    }
}
