//! LightGBM-style gradient boosting with leaf-wise tree growth
//!
//! Key properties:
//! - Leaf-wise (best-first) growth bounded by `num_leaves` and `max_depth`
//! - Logistic loss with L1/L2 leaf regularisation
//! - Optional Gradient-based One-Side Sampling (GOSS): keeps the largest
//!   gradients, samples the rest and amplifies them by `(1 - a) / b`

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Row sampling strategy per boosting round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostingType {
    /// Every row, every round
    Gbdt,
    /// Gradient-based one-side sampling
    Goss,
}

impl std::fmt::Display for BoostingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoostingType::Gbdt => f.write_str("gbdt"),
            BoostingType::Goss => f.write_str("goss"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightGBMConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub num_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
    pub colsample_bytree: f64,
    pub boosting_type: BoostingType,
    /// GOSS: fraction of rows kept by gradient magnitude
    pub top_rate: f64,
    /// GOSS: fraction of rows sampled from the remainder
    pub other_rate: f64,
    pub random_state: u64,
}

impl Default for LightGBMConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            num_leaves: 31,
            max_depth: None,
            min_child_samples: 20,
            reg_lambda: 0.0,
            reg_alpha: 0.0,
            colsample_bytree: 1.0,
            boosting_type: BoostingType::Gbdt,
            top_rate: 0.2,
            other_rate: 0.1,
            random_state: 42,
        }
    }
}

impl LightGBMConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_num_leaves(mut self, leaves: usize) -> Self {
        self.num_leaves = leaves;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_child_samples(mut self, n: usize) -> Self {
        self.min_child_samples = n;
        self
    }

    pub fn with_boosting_type(mut self, boosting_type: BoostingType) -> Self {
        self.boosting_type = boosting_type;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.num_leaves < 2 {
            return Err(PipelineError::ModelFit(format!(
                "num_leaves must be at least 2, got {}",
                self.num_leaves
            )));
        }
        if self.learning_rate <= 0.0 {
            return Err(PipelineError::ModelFit("learning_rate must be positive".into()));
        }
        if self.boosting_type == BoostingType::Goss
            && (self.top_rate <= 0.0 || self.other_rate <= 0.0 || self.top_rate + self.other_rate > 1.0)
        {
            return Err(PipelineError::ModelFit(
                "GOSS needs top_rate, other_rate > 0 with top_rate + other_rate <= 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum LGBNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<LGBNode>,
        right: Box<LGBNode>,
    },
}

impl LGBNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            LGBNode::Leaf { value } => *value,
            LGBNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

// ---- Tree building utilities ----

fn compute_leaf_weight(g: f64, h: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if g.abs() <= alpha { 0.0 } else { g - alpha * g.signum() };
    -g_adj / (h + lambda).max(1e-16)
}

fn compute_gain_single(g: f64, h: f64, lambda: f64) -> f64 {
    g * g / (h + lambda).max(1e-16)
}

fn make_leaf(gradients: &[f64], hessians: &[f64], indices: &[usize], lambda: f64, alpha: f64) -> LGBNode {
    let g: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let h: f64 = indices.iter().map(|&i| hessians[i]).sum();
    LGBNode::Leaf {
        value: compute_leaf_weight(g, h, lambda, alpha),
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

fn find_best_split_for_feature(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    feature: usize,
    config: &LightGBMConfig,
) -> Option<SplitCandidate> {
    let mut sorted: Vec<(usize, f64)> = indices.iter().map(|&i| (i, x[[i, feature]])).collect();
    sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));

    let total_g: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let total_h: f64 = indices.iter().map(|&i| hessians[i]).sum();
    let base_score = compute_gain_single(total_g, total_h, config.reg_lambda);
    let min_child = config.min_child_samples.max(1);

    let mut left_g = 0.0;
    let mut left_h = 0.0;
    let mut best: Option<(f64, f64, usize)> = None;

    for i in 0..sorted.len().saturating_sub(1) {
        left_g += gradients[sorted[i].0];
        left_h += hessians[sorted[i].0];

        if i + 1 < min_child || sorted.len() - i - 1 < min_child {
            continue;
        }
        if sorted[i].1 == sorted[i + 1].1 {
            continue;
        }

        let gain = compute_gain_single(left_g, left_h, config.reg_lambda)
            + compute_gain_single(total_g - left_g, total_h - left_h, config.reg_lambda)
            - base_score;

        if best.map_or(true, |(g, _, _)| gain > g) {
            best = Some((gain, (sorted[i].1 + sorted[i + 1].1) / 2.0, i + 1));
        }
    }

    let (gain, threshold, pos) = best?;
    if gain <= 1e-12 {
        return None;
    }
    Some(SplitCandidate {
        feature,
        threshold,
        gain,
        left: sorted[..pos].iter().map(|&(i, _)| i).collect(),
        right: sorted[pos..].iter().map(|&(i, _)| i).collect(),
    })
}

/// Best split over `features`; ties resolve to the earliest feature
fn best_split(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    features: &[usize],
    config: &LightGBMConfig,
) -> Option<SplitCandidate> {
    let candidates: Vec<Option<SplitCandidate>> = features
        .par_iter()
        .map(|&feat| find_best_split_for_feature(x, gradients, hessians, indices, feat, config))
        .collect();

    candidates.into_iter().flatten().fold(None, |best, cand| match best {
        Some(b) if b.gain >= cand.gain => Some(b),
        _ => Some(cand),
    })
}

struct PendingSplit {
    gain: f64,
    node_id: usize,
    split: SplitCandidate,
}

impl PartialEq for PendingSplit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for PendingSplit {}
impl PartialOrd for PendingSplit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PendingSplit {
    // Highest gain first, then the earliest node
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .partial_cmp(&other.gain)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node_id.cmp(&self.node_id))
    }
}

enum NodeSlot {
    Leaf(Vec<usize>),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Build one tree leaf-wise: always expand the leaf with the largest gain
fn build_lgb_tree(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    config: &LightGBMConfig,
    rng: &mut Xoshiro256PlusPlus,
) -> LGBNode {
    let n_features = x.ncols();
    let n_selected = ((n_features as f64 * config.colsample_bytree).ceil() as usize).clamp(1, n_features.max(1));
    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);
    features.truncate(n_selected);
    features.sort_unstable();

    let max_depth = config.max_depth.unwrap_or(usize::MAX);
    let min_split = config.min_child_samples.max(1) * 2;

    let mut nodes = vec![NodeSlot::Leaf(indices.to_vec())];
    let mut depths = vec![0usize];
    let mut heap = BinaryHeap::new();

    if indices.len() >= min_split && max_depth > 0 {
        if let Some(split) = best_split(x, gradients, hessians, indices, &features, config) {
            heap.push(PendingSplit { gain: split.gain, node_id: 0, split });
        }
    }

    let mut n_leaves = 1usize;
    while n_leaves < config.num_leaves {
        let Some(PendingSplit { node_id, split, .. }) = heap.pop() else {
            break;
        };

        let depth = depths[node_id];
        let left_id = nodes.len();
        let right_id = left_id + 1;
        nodes[node_id] = NodeSlot::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };
        n_leaves += 1;

        for (child_id, child) in [(left_id, split.left), (right_id, split.right)] {
            if depth + 1 < max_depth && child.len() >= min_split {
                if let Some(s) = best_split(x, gradients, hessians, &child, &features, config) {
                    heap.push(PendingSplit {
                        gain: s.gain,
                        node_id: child_id,
                        split: s,
                    });
                }
            }
            nodes.push(NodeSlot::Leaf(child));
            depths.push(depth + 1);
        }
    }

    fn to_node(nodes: &[NodeSlot], idx: usize, g: &[f64], h: &[f64], config: &LightGBMConfig) -> LGBNode {
        match &nodes[idx] {
            NodeSlot::Leaf(indices) => make_leaf(g, h, indices, config.reg_lambda, config.reg_alpha),
            NodeSlot::Split {
                feature,
                threshold,
                left,
                right,
            } => LGBNode::Split {
                feature: *feature,
                threshold: *threshold,
                left: Box::new(to_node(nodes, *left, g, h, config)),
                right: Box::new(to_node(nodes, *right, g, h, config)),
            },
        }
    }
    to_node(&nodes, 0, gradients, hessians, config)
}

/// GOSS row selection. Returns the kept indices and the weight for the sampled small-gradient rows.
fn goss_sample(
    gradients: &[f64],
    top_rate: f64,
    other_rate: f64,
    rng: &mut Xoshiro256PlusPlus,
) -> (Vec<usize>, Vec<usize>, f64) {
    let n = gradients.len();
    let n_top = ((n as f64 * top_rate).ceil() as usize).min(n);
    let n_other = ((n as f64 * other_rate).ceil() as usize).min(n - n_top);

    let mut by_magnitude: Vec<usize> = (0..n).collect();
    by_magnitude.sort_by(|&a, &b| {
        gradients[b]
            .abs()
            .partial_cmp(&gradients[a].abs())
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let top = by_magnitude[..n_top].to_vec();
    let mut rest = by_magnitude[n_top..].to_vec();
    rest.shuffle(rng);
    rest.truncate(n_other);

    let amplify = (1.0 - top_rate) / other_rate;
    (top, rest, amplify)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Binary gradient-boosted classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightGBMClassifier {
    pub config: LightGBMConfig,
    trees: Vec<LGBNode>,
    base_prediction: f64,
    /// Original labels; index 1 is the positive class
    classes: Vec<i64>,
    n_features: usize,
}

impl LightGBMClassifier {
    pub fn new(config: LightGBMConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_prediction: 0.0,
            classes: Vec::new(),
            n_features: 0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        self.config.validate()?;
        let n = x.nrows();
        if n == 0 {
            return Err(PipelineError::ModelFit("empty training set".into()));
        }
        if n != y.len() {
            return Err(PipelineError::ModelFit(format!("{} rows but {} labels", n, y.len())));
        }

        let mut classes: Vec<i64> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        match classes.len() {
            1 => {
                return Err(PipelineError::ModelFit(format!(
                    "target has a single class ({})",
                    classes[0]
                )))
            }
            2 => {}
            k => {
                return Err(PipelineError::ModelFit(format!(
                    "binary classifier got {} classes",
                    k
                )))
            }
        }

        let targets: Vec<f64> = y.iter().map(|&v| if v == classes[1] { 1.0 } else { 0.0 }).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        let pos = targets.iter().sum::<f64>();
        let neg = n as f64 - pos;
        self.base_prediction = (pos / neg).ln();
        self.trees.clear();

        let mut raw = vec![self.base_prediction; n];
        for _ in 0..self.config.n_estimators {
            let probs: Vec<f64> = raw.iter().map(|&r| sigmoid(r)).collect();
            let mut gradients: Vec<f64> = probs.iter().zip(&targets).map(|(&p, &t)| p - t).collect();
            let mut hessians: Vec<f64> = probs.iter().map(|&p| (p * (1.0 - p)).max(1e-16)).collect();

            let indices = match self.config.boosting_type {
                BoostingType::Gbdt => (0..n).collect::<Vec<_>>(),
                BoostingType::Goss => {
                    let (mut top, rest, amplify) =
                        goss_sample(&gradients, self.config.top_rate, self.config.other_rate, &mut rng);
                    for &i in &rest {
                        gradients[i] *= amplify;
                        hessians[i] *= amplify;
                    }
                    top.extend(rest);
                    top
                }
            };

            let tree = build_lgb_tree(x, &gradients, &hessians, &indices, &self.config, &mut rng);
            for (i, r) in raw.iter_mut().enumerate() {
                *r += self.config.learning_rate * tree.predict(x.row(i));
            }
            self.trees.push(tree);
        }

        self.classes = classes;
        self.n_features = x.ncols();
        Ok(())
    }

    fn check_input(&self, n_cols: usize) -> Result<()> {
        if !self.is_fitted() {
            return Err(PipelineError::ModelFit("model is not fitted".into()));
        }
        if n_cols != self.n_features {
            return Err(PipelineError::DataShape(format!(
                "model expects {} features, got {}",
                self.n_features, n_cols
            )));
        }
        Ok(())
    }

    fn raw_score(&self, row: ArrayView1<f64>) -> f64 {
        self.base_prediction
            + self
                .trees
                .iter()
                .map(|t| self.config.learning_rate * t.predict(row))
                .sum::<f64>()
    }

    /// Probability of the positive class for each row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_input(x.ncols())?;
        Ok(x.rows().into_iter().map(|row| sigmoid(self.raw_score(row))).collect())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { self.classes[1] } else { self.classes[0] }))
    }

    /// Label for a single feature row
    pub fn predict_row(&self, row: &[f64]) -> Result<i64> {
        self.check_input(row.len())?;
        let p = sigmoid(self.raw_score(ArrayView1::from(row)));
        Ok(if p >= 0.5 { self.classes[1] } else { self.classes[0] })
    }
}
