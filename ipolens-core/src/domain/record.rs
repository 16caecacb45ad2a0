//! IpoRecord: one row per IPO event.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::flags::Membership;
use super::window::ReturnWindow;

/// Returns per window, indexed by [`ReturnWindow::index`].
pub type WindowReturns = [Option<f64>; 6];

/// A single IPO with its realised returns.
///
/// Returns are fractions (0.25 = +25%). A missing or non-finite input cell
/// is stored as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpoRecord {
    pub symbol: String,
    pub ipo_date: NaiveDate,
    /// The IPO's own returns (`sym_*` columns).
    pub ipo_returns: WindowReturns,
    /// Benchmark returns over the same windows (`iwv_*` columns).
    pub benchmark_returns: WindowReturns,
}

impl IpoRecord {
    pub fn new(symbol: impl Into<String>, ipo_date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            ipo_date,
            ipo_returns: [None; 6],
            benchmark_returns: [None; 6],
        }
    }

    /// Builder-style setter for the IPO return of one window.
    pub fn with_return(mut self, window: ReturnWindow, value: f64) -> Self {
        self.set_ipo_return(window, Some(value));
        self
    }

    /// Builder-style setter for the benchmark return of one window.
    pub fn with_benchmark(mut self, window: ReturnWindow, value: f64) -> Self {
        self.set_benchmark_return(window, Some(value));
        self
    }

    pub fn ipo_return(&self, window: ReturnWindow) -> Option<f64> {
        self.ipo_returns[window.index()]
    }

    pub fn benchmark_return(&self, window: ReturnWindow) -> Option<f64> {
        self.benchmark_returns[window.index()]
    }

    /// Stores a return, discarding NaN and infinities.
    pub fn set_ipo_return(&mut self, window: ReturnWindow, value: Option<f64>) {
        self.ipo_returns[window.index()] = value.filter(|v| v.is_finite());
    }

    pub fn set_benchmark_return(&mut self, window: ReturnWindow, value: Option<f64>) {
        self.benchmark_returns[window.index()] = value.filter(|v| v.is_finite());
    }

    pub fn year(&self) -> i32 {
        self.ipo_date.year()
    }

    pub fn month(&self) -> u32 {
        self.ipo_date.month()
    }
}

/// An IPO together with its derived flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedIpo {
    pub record: IpoRecord,
    pub membership: Membership,
}

impl AnnotatedIpo {
    pub fn ipo_return(&self, window: ReturnWindow) -> Option<f64> {
        self.record.ipo_return(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn year_and_month_come_from_ipo_date() {
        let r = IpoRecord::new("ABNB", date(2020, 12, 10));
        assert_eq!(r.year(), 2020);
        assert_eq!(r.month(), 12);
    }

    #[test]
    fn non_finite_returns_are_dropped() {
        let mut r = IpoRecord::new("X", date(2021, 1, 4));
        r.set_ipo_return(ReturnWindow::Day5, Some(f64::NAN));
        r.set_benchmark_return(ReturnWindow::Day5, Some(f64::INFINITY));
        assert_eq!(r.ipo_return(ReturnWindow::Day5), None);
        assert_eq!(r.benchmark_return(ReturnWindow::Day5), None);
    }

    #[test]
    fn builder_sets_the_right_slot() {
        let r = IpoRecord::new("X", date(2021, 1, 4))
            .with_return(ReturnWindow::Day22, 0.1)
            .with_benchmark(ReturnWindow::Day22, 0.02);
        assert_eq!(r.ipo_return(ReturnWindow::Day22), Some(0.1));
        assert_eq!(r.benchmark_return(ReturnWindow::Day22), Some(0.02));
        assert_eq!(r.ipo_return(ReturnWindow::Day91), None);
    }
}
