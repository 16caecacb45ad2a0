//! Ordinary least squares with one regressor: `y = intercept + slope * x`.

use serde::{Deserialize, Serialize};

use super::correlation::complete_pairs;
use super::distribution::two_sided_p;

/// One estimated coefficient with its inference statistics.
///
/// `t_statistic` and `p_value` are `None` for a perfect fit (zero standard
/// error).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub estimate: f64,
    pub std_error: f64,
    pub t_statistic: Option<f64>,
    pub p_value: Option<f64>,
}

impl Coefficient {
    fn new(estimate: f64, std_error: f64, df: f64) -> Self {
        let t = (std_error > 0.0).then(|| estimate / std_error);
        Self {
            estimate,
            std_error,
            t_statistic: t,
            p_value: t.map(|t| two_sided_p(t, df)),
        }
    }
}

/// Fitted simple linear regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    pub observations: usize,
    pub intercept: Coefficient,
    pub slope: Coefficient,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    /// Standard deviation of the residuals (sqrt of SSE / (n - 2)).
    pub residual_std_error: f64,
}

impl OlsFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept.estimate + self.slope.estimate * x
    }
}

/// Fit `y ~ x` over the rows where both are present.
///
/// `None` with fewer than three complete rows or no variance in `x`.
pub fn ols(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<OlsFit> {
    ols_pairs(&complete_pairs(xs, ys))
}

pub fn ols_pairs(pairs: &[(f64, f64)]) -> Option<OlsFit> {
    let n = pairs.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        sxx += (x - mx) * (x - mx);
        sxy += (x - mx) * (y - my);
        syy += (y - my) * (y - my);
    }
    if sxx <= 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let sse: f64 = pairs
        .iter()
        .map(|&(x, y)| (y - intercept - slope * x).powi(2))
        .sum();

    let df = nf - 2.0;
    let sigma2 = sse / df;
    let r_squared = if syy > 0.0 { 1.0 - sse / syy } else { 1.0 };

    Some(OlsFit {
        observations: n,
        intercept: Coefficient::new(intercept, (sigma2 * (1.0 / nf + mx * mx / sxx)).sqrt(), df),
        slope: Coefficient::new(slope, (sigma2 / sxx).sqrt(), df),
        r_squared,
        adj_r_squared: 1.0 - (1.0 - r_squared) * (nf - 1.0) / df,
        residual_std_error: sigma2.sqrt(),
    })
}
