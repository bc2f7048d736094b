//! Seeded train/test split

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Number of test rows for `n` rows at `train_ratio`: `ceil((1 - ratio) * n)`
pub fn test_size(n: usize, train_ratio: f64) -> usize {
    ((1.0 - train_ratio) * n as f64).ceil() as usize
}

/// Shuffle rows with `seed` and cut them into `(train, test)`.
///
/// The test split takes the first `test_size` shuffled rows. Both splits keep
/// every column; neither gets an index column.
pub fn train_test_split(df: &DataFrame, train_ratio: f64, seed: u64) -> Result<(DataFrame, DataFrame)> {
    let n = df.height();
    if n < 2 {
        return Err(PipelineError::DataShape(format!(
            "need at least 2 rows to split, got {}",
            n
        )));
    }
    let n_test = test_size(n, train_ratio);
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::DataShape(format!(
            "train ratio {} leaves an empty split for {} rows",
            train_ratio, n
        )));
    }

    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let train_idx = indices.split_off(n_test);

    let test = df.take(&IdxCa::from_vec("idx".into(), indices))?;
    let train = df.take(&IdxCa::from_vec("idx".into(), train_idx))?;
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn frame(n: usize) -> DataFrame {
        DataFrame::new(vec![
            Column::new("id".into(), (0..n as i64).collect::<Vec<_>>()),
            Column::new("price".into(), (0..n).map(|i| i as f64 * 1.5).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    fn ids(df: &DataFrame) -> Vec<i64> {
        df.column("id")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn test_sizes_follow_ceiling() {
        assert_eq!(test_size(10, 0.8), 2);
        assert_eq!(test_size(11, 0.8), 3);
        assert_eq!(test_size(36275, 0.8), 7255);
    }

    #[test]
    fn test_split_partitions_rows() {
        let df = frame(101);
        let (train, test) = train_test_split(&df, 0.8, 42).unwrap();
        assert_eq!(test.height(), 21);
        assert_eq!(train.height(), 80);

        let train_ids: HashSet<i64> = ids(&train).into_iter().collect();
        let test_ids: HashSet<i64> = ids(&test).into_iter().collect();
        assert!(train_ids.is_disjoint(&test_ids));
        assert_eq!(train_ids.len() + test_ids.len(), 101);
        assert_eq!(train.get_column_names(), df.get_column_names());
    }

    #[test]
    fn test_split_is_seeded() {
        let df = frame(50);
        let (a, _) = train_test_split(&df, 0.7, 7).unwrap();
        let (b, _) = train_test_split(&df, 0.7, 7).unwrap();
        let (c, _) = train_test_split(&df, 0.7, 8).unwrap();
        assert_eq!(ids(&a), ids(&b));
        assert_ne!(ids(&a), ids(&c));
    }

    #[test]
    fn test_too_few_rows() {
        let err = train_test_split(&frame(1), 0.8, 42).unwrap_err();
        assert!(matches!(err, PipelineError::DataShape(_)));
        assert!(train_test_split(&frame(2), 0.1, 42).is_err());
    }
}
