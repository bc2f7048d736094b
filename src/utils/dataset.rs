//! Dense numeric table bridging polars frames and ndarray models

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use polars::prelude::*;
use std::collections::HashSet;

/// Named columns over a row-major `f64` matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(PipelineError::DataShape(format!(
                "{} column names for {} value columns",
                columns.len(),
                values.ncols()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Cast every column of `df` to `f64`.
    ///
    /// Nulls, and strings that do not parse as numbers, are rejected.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let col_data: Vec<Vec<f64>> = columns
            .iter()
            .map(|name| {
                let series = df
                    .column(name)?
                    .as_materialized_series()
                    .cast(&DataType::Float64)?;
                let values = series
                    .f64()?
                    .into_iter()
                    .collect::<Option<Vec<f64>>>()
                    .ok_or_else(|| {
                        PipelineError::DataShape(format!(
                            "column {} has missing or non-numeric values",
                            name
                        ))
                    })?;
                Ok(values)
            })
            .collect::<Result<_>>()?;

        let n_rows = df.height();
        let values = Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| col_data[c][r]);
        Ok(Self { columns, values })
    }

    /// Convert back to a frame. `integer_columns` are written as `i64`.
    pub fn to_frame(&self, integer_columns: &[&str]) -> Result<DataFrame> {
        let columns = self
            .columns
            .iter()
            .zip(self.values.columns())
            .map(|(name, col)| {
                if integer_columns.contains(&name.as_str()) {
                    Column::new(name.as_str().into(), col.iter().map(|&v| v.round() as i64).collect::<Vec<_>>())
                } else {
                    Column::new(name.as_str().into(), col.to_vec())
                }
            })
            .collect::<Vec<_>>();
        Ok(DataFrame::new(columns)?)
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn require_index(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::DataShape(format!("column {} not found", name)))
    }

    pub fn column(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        let idx = self.require_index(name)?;
        Ok(self.values.column(idx))
    }

    /// Apply `f` to every value of one column
    pub fn map_column(&mut self, name: &str, f: impl Fn(f64) -> f64) -> Result<()> {
        let idx = self.require_index(name)?;
        self.values.column_mut(idx).mapv_inplace(f);
        Ok(())
    }

    /// Drop exact duplicate rows, keeping first occurrences. Returns the number removed.
    pub fn drop_duplicates(&mut self) -> usize {
        let mut seen: HashSet<Vec<u64>> = HashSet::with_capacity(self.n_rows());
        let keep: Vec<usize> = self
            .values
            .rows()
            .into_iter()
            .enumerate()
            .filter_map(|(i, row)| {
                // -0.0 and 0.0 compare equal as values, so normalise before hashing
                let key: Vec<u64> = row
                    .iter()
                    .map(|&v| if v == 0.0 { 0u64 } else { v.to_bits() })
                    .collect();
                seen.insert(key).then_some(i)
            })
            .collect();

        let removed = self.n_rows() - keep.len();
        if removed > 0 {
            self.values = self.values.select(Axis(0), &keep);
        }
        removed
    }

    /// New table with `names` in the given order
    pub fn select(&self, names: &[String]) -> Result<Dataset> {
        let indices = names
            .iter()
            .map(|name| self.require_index(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Dataset {
            columns: names.to_vec(),
            values: self.values.select(Axis(1), &indices),
        })
    }

    /// Separate the target column into integer labels.
    ///
    /// Returns `(features, labels, feature_names)` with features in table order.
    pub fn split_target(&self, target: &str) -> Result<(Array2<f64>, Array1<i64>, Vec<String>)> {
        let target_idx = self.require_index(target)?;
        let labels = self
            .values
            .column(target_idx)
            .iter()
            .map(|&v| {
                if v.fract() != 0.0 || !v.is_finite() {
                    Err(PipelineError::DataShape(format!(
                        "target {} has non-integer value {}",
                        target, v
                    )))
                } else {
                    Ok(v as i64)
                }
            })
            .collect::<Result<Vec<i64>>>()?;

        let feature_idx: Vec<usize> = (0..self.n_cols()).filter(|&i| i != target_idx).collect();
        let names = feature_idx.iter().map(|&i| self.columns[i].clone()).collect();
        let features = self.values.select(Axis(1), &feature_idx);
        Ok((features, Array1::from(labels), names))
    }

    /// Assemble a table from features and labels, target column last
    pub fn from_parts(
        feature_names: Vec<String>,
        features: Array2<f64>,
        target: &str,
        labels: &Array1<i64>,
    ) -> Result<Dataset> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::DataShape(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        let target_col = labels.mapv(|v| v as f64).insert_axis(Axis(1));
        let values = ndarray::concatenate(Axis(1), &[features.view(), target_col.view()])?;
        let mut columns = feature_names;
        columns.push(target.to_string());
        Dataset::new(columns, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["a".into(), "b".into(), "y".into()],
            array![[1.0, 2.0, 0.0], [3.0, 4.0, 1.0], [1.0, 2.0, 0.0], [5.0, 6.0, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_from_frame_casts_integers() {
        let df = DataFrame::new(vec![
            Column::new("x".into(), vec![1i64, 2, 3]),
            Column::new("p".into(), vec![1.5f64, 2.5, 3.5]),
        ])
        .unwrap();
        let ds = Dataset::from_frame(&df).unwrap();
        assert_eq!(ds.columns(), &["x".to_string(), "p".to_string()]);
        assert_eq!(ds.values()[[2, 0]], 3.0);
        assert_eq!(ds.values()[[0, 1]], 1.5);
    }

    #[test]
    fn test_from_frame_rejects_text() {
        let df = DataFrame::new(vec![Column::new("s".into(), vec!["a", "b"])]).unwrap();
        let err = Dataset::from_frame(&df).unwrap_err();
        assert!(matches!(err, PipelineError::DataShape(_)));
    }

    #[test]
    fn test_drop_duplicates_keeps_first() {
        let mut ds = sample();
        assert_eq!(ds.drop_duplicates(), 1);
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.values()[[1, 0]], 3.0);
    }

    #[test]
    fn test_select_reorders() {
        let ds = sample().select(&["y".into(), "a".into()]).unwrap();
        assert_eq!(ds.columns(), &["y".to_string(), "a".to_string()]);
        assert_eq!(ds.values()[[1, 0]], 1.0);
        assert!(sample().select(&["missing".into()]).is_err());
    }

    #[test]
    fn test_split_target_and_rebuild() {
        let (x, y, names) = sample().split_target("y").unwrap();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(x.ncols(), 2);
        assert_eq!(y.to_vec(), vec![0, 1, 0, 1]);

        let rebuilt = Dataset::from_parts(names, x, "y", &y).unwrap();
        assert_eq!(rebuilt, sample());
    }

    #[test]
    fn test_split_target_rejects_fractional_labels() {
        let ds = Dataset::new(vec!["a".into(), "y".into()], array![[1.0, 0.5]]).unwrap();
        assert!(ds.split_target("y").is_err());
    }

    #[test]
    fn test_to_frame_writes_integer_target() {
        let df = sample().to_frame(&["y"]).unwrap();
        assert_eq!(df.column("y").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("a").unwrap().dtype(), &DataType::Float64);
    }
}
