//! Descriptive statistics over a column of optional values.
//!
//! Every function skips missing and non-finite values, the way grouped
//! aggregates over a table with gaps are normally computed.

use serde::{Deserialize, Serialize};

/// Descriptive statistics for one column (or one group of a column).
///
/// `count` is the number of present, finite values. All other fields are
/// `None` when `count == 0`; `std` is also `None` when `count < 2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator).
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl Summary {
    /// Summarise a column, ignoring `None`, NaN and infinities.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut sorted = finite_values(values);
        sorted.sort_by(f64::total_cmp);
        Self::from_sorted(&sorted)
    }

    /// Summarise values that are already finite and sorted ascending.
    pub fn from_sorted(sorted: &[f64]) -> Self {
        if sorted.is_empty() {
            return Self::default();
        }
        Self {
            count: sorted.len(),
            mean: Some(mean(sorted)),
            std: sample_std(sorted),
            min: sorted.first().copied(),
            q25: quantile(sorted, 0.25),
            median: quantile(sorted, 0.5),
            q75: quantile(sorted, 0.75),
            max: sorted.last().copied(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Collect the present, finite values of a column.
pub fn finite_values<I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect()
}

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; `None` with fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Quantile of an ascending slice, linearly interpolated between the two
/// closest ranks (position `q * (n - 1)`).
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median of unsorted values.
pub fn median<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sorted = finite_values(values);
    sorted.sort_by(f64::total_cmp);
    quantile(&sorted, 0.5)
}
