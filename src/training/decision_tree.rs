//! Gini decision tree classifier
//!
//! Nodes live in a flat arena and are grown with an explicit work stack, so
//! unbounded depth on large tables cannot overflow the thread stack.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features examined per split; all when `None`
    pub max_features: Option<usize>,
    pub random_state: u64,
    n_features: usize,
    classes: Vec<i64>,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    child_impurity: (f64, f64),
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}

fn class_counts(labels: &[usize], indices: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in indices {
        counts[labels[i]] += 1;
    }
    counts
}

impl DecisionTree {
    pub fn new_classifier() -> Self {
        Self {
            nodes: Vec::new(),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: 42,
            n_features: 0,
            classes: Vec::new(),
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Examine a random subset of `k` features at every split
    pub fn with_max_features(mut self, k: usize) -> Self {
        self.max_features = Some(k.max(1));
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(PipelineError::DataShape(format!(
                "{} rows but {} labels",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(PipelineError::ModelFit("empty training set".into()));
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let labels: Vec<usize> = y
            .iter()
            .map(|v| classes.binary_search(v).unwrap_or(0))
            .collect();

        self.n_features = x.ncols();
        self.classes = classes;
        self.nodes.clear();

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut importances = vec![0.0; self.n_features];
        let n_classes = self.classes.len();

        self.nodes.push(TreeNode::Leaf { class: 0 });
        let mut stack: Vec<(usize, Vec<usize>, usize)> = vec![(0, (0..n_samples).collect(), 0)];

        while let Some((node_id, indices, depth)) = stack.pop() {
            let counts = class_counts(&labels, &indices, n_classes);
            let impurity = gini(&counts, indices.len());
            let majority = counts
                .iter()
                .enumerate()
                .fold((0, 0), |best, (c, &n)| if n > best.1 { (c, n) } else { best })
                .0;

            let stop = indices.len() < self.min_samples_split
                || self.max_depth.map_or(false, |d| depth >= d)
                || impurity <= 0.0;

            let split = if stop {
                None
            } else {
                self.find_best_split(x, &labels, &indices, n_classes, impurity, &mut rng)
            };

            let Some(split) = split else {
                self.nodes[node_id] = TreeNode::Leaf { class: majority };
                continue;
            };

            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, split.feature]] <= split.threshold);

            let n = indices.len() as f64;
            importances[split.feature] += n * impurity
                - left.len() as f64 * split.child_impurity.0
                - right.len() as f64 * split.child_impurity.1;

            let left_id = self.nodes.len();
            let right_id = left_id + 1;
            self.nodes.push(TreeNode::Leaf { class: majority });
            self.nodes.push(TreeNode::Leaf { class: majority });
            self.nodes[node_id] = TreeNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: left_id,
                right: right_id,
            };

            stack.push((right_id, right, depth + 1));
            stack.push((left_id, left, depth + 1));
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(self)
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        labels: &[usize],
        indices: &[usize],
        n_classes: usize,
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n_features = x.ncols();
        let k = self.max_features.unwrap_or(n_features).min(n_features);
        let mut features: Vec<usize> = if k < n_features {
            index::sample(rng, n_features, k).into_vec()
        } else {
            (0..n_features).collect()
        };
        features.sort_unstable();

        let n = indices.len();
        let total_counts = class_counts(labels, indices, n_classes);
        let mut best: Option<BestSplit> = None;

        for feature in features {
            let mut sorted: Vec<(f64, usize)> = indices.iter().map(|&i| (x[[i, feature]], labels[i])).collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0usize; n_classes];
            for pos in 0..n - 1 {
                left_counts[sorted[pos].1] += 1;
                let n_left = pos + 1;
                let n_right = n - n_left;

                if sorted[pos].0 == sorted[pos + 1].0 {
                    continue;
                }
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let right_counts: Vec<usize> = total_counts
                    .iter()
                    .zip(&left_counts)
                    .map(|(t, l)| t - l)
                    .collect();
                let gl = gini(&left_counts, n_left);
                let gr = gini(&right_counts, n_right);
                let weighted = (n_left as f64 * gl + n_right as f64 * gr) / n as f64;
                let gain = parent_impurity - weighted;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    let (lo, hi) = (sorted[pos].0, sorted[pos + 1].0);
                    let mid = lo + (hi - lo) / 2.0;
                    // Adjacent floats can round the midpoint up onto `hi`
                    let threshold = if mid >= hi { lo } else { mid };
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        gain,
                        child_impurity: (gl, gr),
                    });
                }
            }
        }
        best
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        if self.nodes.is_empty() {
            return Err(PipelineError::ModelFit("tree is not fitted".into()));
        }
        if x.ncols() != self.n_features {
            return Err(PipelineError::DataShape(format!(
                "tree expects {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let mut node = 0;
                loop {
                    match &self.nodes[node] {
                        TreeNode::Leaf { class } => break self.classes[*class],
                        TreeNode::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => node = if row[*feature] <= *threshold { *left } else { *right },
                    }
                }
            })
            .collect())
    }

    /// Normalized mean decrease in impurity per feature
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}
