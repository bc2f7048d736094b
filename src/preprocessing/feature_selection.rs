//! Importance-based feature selection

use crate::error::{PipelineError, Result};
use crate::training::RandomForest;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Keeps the `k` features a random forest ranks highest by mean decrease in impurity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelector {
    k: usize,
    n_estimators: usize,
    random_state: u64,
    scores: Option<Vec<f64>>,
    selected_indices: Option<Vec<usize>>,
    feature_names: Option<Vec<String>>,
}

impl FeatureSelector {
    pub fn top_k(k: usize) -> Self {
        Self {
            k,
            n_estimators: 100,
            random_state: 42,
            scores: None,
            selected_indices: None,
            feature_names: None,
        }
    }

    /// Number of trees in the ranking forest
    pub fn with_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let n_features = x.ncols();
        if self.k == 0 || self.k > n_features {
            return Err(PipelineError::Validation(format!(
                "cannot select {} of {} features",
                self.k, n_features
            )));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != n_features {
                return Err(PipelineError::DataShape(format!(
                    "{} feature names for {} columns",
                    names.len(),
                    n_features
                )));
            }
        }

        let mut forest = RandomForest::new_classifier(self.n_estimators).with_random_state(self.random_state);
        forest.fit(x, y)?;
        let scores = forest
            .feature_importances()
            .map(|imp| imp.to_vec())
            .ok_or_else(|| PipelineError::ModelFit("forest produced no importances".into()))?;

        // Stable sort: equal scores keep column order
        let mut ranked: Vec<usize> = (0..n_features).collect();
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        ranked.truncate(self.k);

        debug!(scores = ?scores, selected = ?ranked, "Ranked features by importance");
        self.scores = Some(scores);
        self.selected_indices = Some(ranked);
        Ok(())
    }

    /// Indices of the kept features, most important first
    pub fn selected_indices(&self) -> Option<&[usize]> {
        self.selected_indices.as_deref()
    }

    /// Importance of every input feature
    pub fn scores(&self) -> Option<&[f64]> {
        self.scores.as_deref()
    }

    pub fn selected_names(&self) -> Option<Vec<String>> {
        let names = self.feature_names.as_ref()?;
        let indices = self.selected_indices.as_ref()?;
        Some(indices.iter().map(|&i| names[i].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Column 1 decides the label, the others are noise
    fn informative() -> (Array2<f64>, Array1<i64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let n = 120;
        let x = Array2::from_shape_fn((n, 4), |(i, j)| {
            if j == 1 {
                (i % 2) as f64 * 10.0 + rng.gen::<f64>()
            } else {
                rng.gen::<f64>()
            }
        });
        let y = Array1::from_shape_fn(n, |i| (i % 2) as i64);
        (x, y)
    }

    #[test]
    fn test_informative_feature_ranked_first() {
        let (x, y) = informative();
        let mut selector = FeatureSelector::top_k(2)
            .with_estimators(20)
            .with_feature_names(vec!["a".into(), "b".into(), "c".into(), "d".into()]);
        selector.fit(&x, &y).unwrap();

        assert_eq!(selector.selected_indices().unwrap().len(), 2);
        assert_eq!(selector.selected_indices().unwrap()[0], 1);
        assert_eq!(selector.selected_names().unwrap()[0], "b");
        let total: f64 = selector.scores().unwrap().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_selection() {
        let (x, y) = informative();
        let mut a = FeatureSelector::top_k(3).with_estimators(10);
        let mut b = FeatureSelector::top_k(3).with_estimators(10);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.selected_indices(), b.selected_indices());
    }

    #[test]
    fn test_k_larger_than_features_rejected() {
        let (x, y) = informative();
        let err = FeatureSelector::top_k(5).fit(&x, &y).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
