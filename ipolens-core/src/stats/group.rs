//! Grouped aggregation: split rows by an ordered key, summarise a value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::summary::{finite_values, quantile, Summary};

/// Summarise `value_fn` for each distinct key produced by `key_fn`.
///
/// Rows whose key is `None` are excluded. A group is present as soon as a
/// single row carries its key, even when none of that group's values are
/// present (its summary then has `count == 0`). Keys come back sorted.
pub fn group_summaries<T, K, KF, VF>(rows: &[T], key_fn: KF, value_fn: VF) -> BTreeMap<K, Summary>
where
    K: Ord,
    KF: Fn(&T) -> Option<K>,
    VF: Fn(&T) -> Option<f64>,
{
    let mut buckets: BTreeMap<K, Vec<Option<f64>>> = BTreeMap::new();
    for row in rows {
        if let Some(key) = key_fn(row) {
            buckets.entry(key).or_default().push(value_fn(row));
        }
    }
    buckets
        .into_iter()
        .map(|(key, values)| (key, Summary::from_values(values)))
        .collect()
}

/// Number of rows per key; rows with a `None` key are skipped.
pub fn count_by<T, K, KF>(rows: &[T], key_fn: KF) -> BTreeMap<K, usize>
where
    K: Ord,
    KF: Fn(&T) -> Option<K>,
{
    let mut counts = BTreeMap::new();
    for row in rows {
        if let Some(key) = key_fn(row) {
            *counts.entry(key).or_insert(0usize) += 1;
        }
    }
    counts
}

/// Mean of `value_fn` over the rows accepted by `filter`.
pub fn filtered_mean<T, F, VF>(rows: &[T], filter: F, value_fn: VF) -> Option<f64>
where
    F: Fn(&T) -> bool,
    VF: Fn(&T) -> Option<f64>,
{
    Summary::from_values(rows.iter().filter(|r| filter(r)).map(value_fn)).mean
}

/// Five-number summary plus Tukey whiskers, for box plots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Smallest value within `q1 - 1.5 * IQR`.
    pub lower_whisker: f64,
    /// Largest value within `q3 + 1.5 * IQR`.
    pub upper_whisker: f64,
    /// Values beyond either whisker.
    pub outliers: usize,
}

impl BoxStats {
    /// `None` when no finite value is present.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut sorted = finite_values(values);
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25)?;
        let median = quantile(&sorted, 0.5)?;
        let q3 = quantile(&sorted, 0.75)?;
        let iqr = q3 - q1;
        let lo_fence = q1 - 1.5 * iqr;
        let hi_fence = q3 + 1.5 * iqr;

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|v| *v >= lo_fence && *v <= hi_fence)
            .collect();
        let lower_whisker = inside.first().copied().unwrap_or(q1);
        let upper_whisker = inside.last().copied().unwrap_or(q3);

        Some(Self {
            count: sorted.len(),
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers: sorted.len() - inside.len(),
        })
    }
}
