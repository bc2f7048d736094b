//! Skewness statistic and log1p skew correction

use crate::error::{PipelineError, Result};
use crate::utils::Dataset;
use ndarray::ArrayView1;
use tracing::debug;

/// Adjusted Fisher-Pearson sample skewness.
///
/// `None` when fewer than three values are present or the variance is zero.
pub fn skewness(values: ArrayView1<f64>) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let mean = values.sum() / nf;
    let (m2, m3) = values.iter().fold((0.0, 0.0), |(m2, m3), &v| {
        let d = v - mean;
        (m2 + d * d, m3 + d * d * d)
    });
    let m2 = m2 / nf;
    let m3 = m3 / nf;
    if m2 <= (f64::EPSILON * mean).powi(2) {
        return None;
    }
    Some((nf * (nf - 1.0)).sqrt() / (nf - 2.0) * m3 / m2.powf(1.5))
}

/// Applies `ln(1 + x)` to numeric columns whose skewness exceeds a threshold.
///
/// The statistic is recomputed on every call, so data that is still skewed
/// after one pass is transformed again.
#[derive(Debug, Clone, Copy)]
pub struct SkewCorrector {
    threshold: f64,
}

impl SkewCorrector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Transform qualifying `columns` in place and return their names
    pub fn apply(&self, data: &mut Dataset, columns: &[String]) -> Result<Vec<String>> {
        let mut transformed = Vec::new();

        for name in columns {
            let column = data
                .column(name)
                .map_err(|_| PipelineError::DataShape(format!("numerical column {} not found", name)))?;
            let skew = match skewness(column) {
                Some(s) => s,
                None => {
                    debug!(column = %name, "Skewness undefined, column left as is");
                    continue;
                }
            };
            if skew <= self.threshold {
                continue;
            }
            if let Some(bad) = column.iter().find(|&&v| v <= -1.0) {
                return Err(PipelineError::DataShape(format!(
                    "column {} has value {} outside the log1p domain",
                    name, bad
                )));
            }

            data.map_column(name, f64::ln_1p)?;
            debug!(column = %name, skewness = skew, "Applied log1p");
            transformed.push(name.clone());
        }

        Ok(transformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_skewness_matches_sample_formula() {
        // pd.Series([1, 2, 3, 10]).skew() == 1.76363...
        let s = skewness(array![1.0, 2.0, 3.0, 10.0].view()).unwrap();
        assert!((s - 1.763_6).abs() < 1e-3, "skew {}", s);

        let symmetric = skewness(array![1.0, 2.0, 3.0].view()).unwrap();
        assert!(symmetric.abs() < 1e-12);
    }

    #[test]
    fn test_skewness_undefined() {
        assert!(skewness(array![1.0, 2.0].view()).is_none());
        assert!(skewness(array![4.0, 4.0, 4.0, 4.0].view()).is_none());
    }

    fn skewed() -> Dataset {
        let mut values = Array2::<f64>::zeros((20, 2));
        for i in 0..20 {
            values[[i, 0]] = if i == 19 { 1000.0 } else { i as f64 % 3.0 };
            values[[i, 1]] = i as f64;
        }
        Dataset::new(vec!["lead_time".into(), "arrival_date".into()], values).unwrap()
    }

    #[test]
    fn test_only_skewed_columns_transformed() {
        let mut data = skewed();
        let cols = vec!["lead_time".to_string(), "arrival_date".to_string()];
        let done = SkewCorrector::new(1.0).apply(&mut data, &cols).unwrap();

        assert_eq!(done, vec!["lead_time".to_string()]);
        assert!((data.values()[[19, 0]] - 1000f64.ln_1p()).abs() < 1e-12);
        assert_eq!(data.values()[[19, 1]], 19.0);
    }

    #[test]
    fn test_statistic_recomputed_on_each_pass() {
        let mut data = skewed();
        let cols = vec!["lead_time".to_string()];
        let corrector = SkewCorrector::new(1.0);
        corrector.apply(&mut data, &cols).unwrap();
        let once = data.values()[[19, 0]];

        // Still skewed after one pass, so the second pass applies again
        let again = corrector.apply(&mut data, &cols).unwrap();
        assert_eq!(again, cols);
        assert!((data.values()[[19, 0]] - once.ln_1p()).abs() < 1e-12);
    }

    #[test]
    fn test_missing_column_rejected() {
        let mut data = skewed();
        let err = SkewCorrector::new(1.0)
            .apply(&mut data, &["no_of_adults".to_string()])
            .unwrap_err();
        assert!(matches!(err, PipelineError::DataShape(_)));
    }
}
