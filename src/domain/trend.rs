//! Descriptive statistics and two-point growth over a stored column.
//!
//! Standard deviation is the sample estimator (n - 1 denominator). Growth
//! compares the first and last values in stored order; rows are assumed to be
//! chronological already.

use serde::Serialize;

use crate::domain::dataset::DatasetStore;
use crate::domain::error::AnalystError;

pub const MIN_TREND_POINTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    pub column: String,
    pub data_points: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub growth_rate: Option<f64>,
}

pub fn analyze_trend(
    store: &DatasetStore,
    dataset_name: &str,
    column: &str,
) -> Result<TrendResult, AnalystError> {
    let values = store.get_column_values(dataset_name, column)?;
    summarize(column, &values)
}

/// Statistics over an already-extracted numeric series.
pub fn summarize(column: &str, values: &[f64]) -> Result<TrendResult, AnalystError> {
    if values.len() < MIN_TREND_POINTS {
        return Err(AnalystError::InsufficientData {
            column: column.to_string(),
            points: values.len(),
            minimum: MIN_TREND_POINTS,
        });
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(TrendResult {
        column: column.to_string(),
        data_points: values.len(),
        mean,
        median: median(values),
        std: variance.sqrt(),
        min,
        max,
        growth_rate: growth_rate(values),
    })
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn growth_rate(values: &[f64]) -> Option<f64> {
    let first = *values.first()?;
    let last = *values.last()?;
    (first > 0.0).then(|| (last - first) / first * 100.0)
}
