//! Pearson correlation over pairwise-complete observations.

use serde::{Deserialize, Serialize};

/// Rows where both values are present and finite.
pub fn complete_pairs(xs: &[Option<f64>], ys: &[Option<f64>]) -> Vec<(f64, f64)> {
    xs.iter()
        .zip(ys.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .collect()
}

/// Pearson correlation coefficient.
///
/// `None` with fewer than two complete pairs or when either side has zero
/// variance.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    pearson_pairs(&complete_pairs(xs, ys))
}

pub fn pearson_pairs(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Square correlation matrix with labelled rows/columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// `values[i][j]` = correlation of column i with column j.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Pairwise-complete correlation of every column pair.
    ///
    /// All columns must have the same length (one entry per row).
    pub fn compute(columns: &[(String, Vec<Option<f64>>)]) -> Self {
        let k = columns.len();
        let mut values = vec![vec![None; k]; k];
        for i in 0..k {
            for j in i..k {
                let r = if i == j {
                    // Diagonal is 1 whenever the column has any variance.
                    pearson(&columns[i].1, &columns[i].1)
                } else {
                    pearson(&columns[i].1, &columns[j].1)
                };
                values[i][j] = r;
                values[j][i] = r;
            }
        }
        Self {
            labels: columns.iter().map(|(name, _)| name.clone()).collect(),
            values,
        }
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == row)?;
        let j = self.labels.iter().position(|l| l == col)?;
        self.values[i][j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn col(v: &[f64]) -> Vec<Option<f64>> {
        v.iter().copied().map(Some).collect()
    }

    #[test]
    fn perfect_positive_and_negative() {
        let x = col(&[1.0, 2.0, 3.0, 4.0]);
        let y = col(&[2.0, 4.0, 6.0, 8.0]);
        let z = col(&[8.0, 6.0, 4.0, 2.0]);
        assert!((pearson(&x, &y).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &z).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn uses_pairwise_complete_rows() {
        let x = vec![Some(1.0), Some(2.0), None, Some(3.0)];
        let y = vec![Some(1.0), Some(2.0), Some(50.0), Some(3.0)];
        assert!((pearson(&x, &y).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(pearson(&col(&[1.0]), &col(&[2.0])), None);
        assert_eq!(pearson(&col(&[1.0, 1.0, 1.0]), &col(&[1.0, 2.0, 3.0])), None);
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let m = CorrelationMatrix::compute(&[
            ("a".to_string(), col(&[1.0, 2.0, 3.0, 5.0])),
            ("b".to_string(), col(&[2.0, 1.0, 4.0, 3.0])),
            ("c".to_string(), col(&[9.0, 7.0, 4.0, 1.0])),
        ]);
        for i in 0..3 {
            assert!((m.values[i][i].unwrap() - 1.0).abs() < 1e-12);
            for j in 0..3 {
                assert_eq!(m.values[i][j], m.values[j][i]);
            }
        }
        assert_eq!(m.get("a", "b"), m.values[0][1]);
        assert_eq!(m.get("a", "missing"), None);
    }

    proptest! {
        #[test]
        fn correlation_is_bounded(
            pairs in prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 3..50)
        ) {
            if let Some(r) = pearson_pairs(&pairs) {
                prop_assert!((-1.0..=1.0).contains(&r));
            }
        }
    }
}
