//! Row-level classifications and derived returns.

use crate::domain::Day0Level;

/// Default day-0 cutoff: a first-day return of 100% or more is abnormal.
pub const DEFAULT_ABNORMAL_THRESHOLD: f64 = 1.0;

/// Classify a first-day return against the abnormal threshold.
///
/// `Normal` when `day0 < threshold`, `Abnormal` otherwise. A missing return
/// is left unclassified.
pub fn classify_day0(day0: Option<f64>, threshold: f64) -> Option<Day0Level> {
    day0.map(|r| {
        if r < threshold {
            Day0Level::Normal
        } else {
            Day0Level::Abnormal
        }
    })
}

/// Return from day 22 to day 252 (roughly the eleven months after the
/// first month), derived from the cumulative 22-day and 252-day returns:
/// `(1 + r252) / (1 + r22) - 1`.
pub fn eleven_month_return(r22: Option<f64>, r252: Option<f64>) -> Option<f64> {
    let (r22, r252) = (r22?, r252?);
    let base = 1.0 + r22;
    if base == 0.0 {
        return None;
    }
    let value = (1.0 + r252) / base - 1.0;
    value.is_finite().then_some(value)
}
