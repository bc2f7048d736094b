//! Label encoding for categorical columns

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Category vocabulary of one column; a category's code is its position
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ColumnMapping {
    categories: Vec<String>,
    codes: HashMap<String, i64>,
}

impl ColumnMapping {
    /// Vocabulary holding the distinct `values` in sorted order
    fn sorted(values: &[String]) -> Self {
        let mut mapping = Self::default();
        mapping.extend(values);
        mapping
    }

    /// Append the categories of `values` not yet known, sorted among
    /// themselves, and return them.
    fn extend(&mut self, values: &[String]) -> Vec<String> {
        let mut fresh: Vec<String> = values
            .iter()
            .filter(|v| !self.codes.contains_key(v.as_str()))
            .cloned()
            .collect();
        sort_categories(&mut fresh);
        fresh.dedup();
        for value in &fresh {
            self.codes.insert(value.clone(), self.categories.len() as i64);
            self.categories.push(value.clone());
        }
        fresh
    }

    fn code(&self, value: &str) -> Option<i64> {
        self.codes.get(value).copied()
    }
}

/// Numeric order when every value parses as a number, byte order otherwise
fn sort_categories(values: &mut [String]) {
    let numeric: Option<Vec<f64>> = values.iter().map(|v| v.parse::<f64>().ok()).collect();
    match numeric {
        Some(keys) if keys.iter().all(|k| k.is_finite()) => {
            let mut keyed: Vec<(f64, String)> = keys.into_iter().zip(values.iter().cloned()).collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
            for (slot, (_, value)) in values.iter_mut().zip(keyed) {
                *slot = value;
            }
        }
        _ => values.sort_unstable(),
    }
}

/// Ordinal encoder whose codes index each column's sorted categories.
///
/// Values are compared as strings, so integer-typed categorical columns are
/// encoded the same way as text ones (in numeric order). Categories first
/// seen at transform time are appended after the fitted vocabulary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    columns: Vec<String>,
    mappings: HashMap<String, ColumnMapping>,
}

fn string_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let col = df
        .column(column)
        .map_err(|_| PipelineError::DataShape(format!("categorical column {} not found", column)))?;
    let series = col.as_materialized_series().cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::to_string).ok_or_else(|| {
                PipelineError::DataShape(format!("categorical column {} has missing values", column))
            })
        })
        .collect()
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Learn the vocabulary of each column
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.columns = columns.to_vec();
        self.mappings.clear();
        for column in columns {
            let mapping = ColumnMapping::sorted(&string_values(df, column)?);
            self.mappings.insert(column.clone(), mapping);
        }
        Ok(self)
    }

    /// Replace each fitted column with its integer codes
    pub fn transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted() {
            return Err(PipelineError::Validation("label encoder is not fitted".into()));
        }
        let mut result = df.clone();

        for column in &self.columns {
            let values = string_values(df, column)?;
            let mapping = self.mappings.entry(column.clone()).or_default();
            let unseen = mapping.extend(&values);
            let codes: Vec<i64> = values.iter().filter_map(|v| mapping.code(v)).collect();

            if !unseen.is_empty() {
                warn!(column = %column, categories = ?unseen, "Unseen categories given fresh codes");
            }
            result.with_column(Column::new(column.as_str().into(), codes))?;
        }
        Ok(result)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Categories of `column` in code order
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.mappings.get(column).map(|m| m.categories.as_slice())
    }
}
