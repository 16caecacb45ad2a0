//! Return horizons measured from the IPO date.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed return horizon, in trading days after the IPO.
///
/// Each window has one IPO return column (`sym_*`) and one benchmark
/// return column (`iwv_*`, the Russell 3000 ETF) in the input CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnWindow {
    /// First trading day, offer price to close.
    Day0,
    Day1,
    Day5,
    /// Roughly one month.
    Day22,
    /// Roughly one quarter.
    Day91,
    /// Roughly one year.
    Day252,
}

impl ReturnWindow {
    /// Every window present in the input data.
    pub const ALL: [ReturnWindow; 6] = [
        ReturnWindow::Day0,
        ReturnWindow::Day1,
        ReturnWindow::Day5,
        ReturnWindow::Day22,
        ReturnWindow::Day91,
        ReturnWindow::Day252,
    ];

    /// The five windows compared across SPAC and non-SPAC IPOs.
    pub const STUDY: [ReturnWindow; 5] = [
        ReturnWindow::Day0,
        ReturnWindow::Day5,
        ReturnWindow::Day22,
        ReturnWindow::Day91,
        ReturnWindow::Day252,
    ];

    /// Position in [`ReturnWindow::ALL`]; used to index per-window arrays.
    pub const fn index(self) -> usize {
        match self {
            ReturnWindow::Day0 => 0,
            ReturnWindow::Day1 => 1,
            ReturnWindow::Day5 => 2,
            ReturnWindow::Day22 => 3,
            ReturnWindow::Day91 => 4,
            ReturnWindow::Day252 => 5,
        }
    }

    /// Trading days covered by the window.
    pub const fn trading_days(self) -> u32 {
        match self {
            ReturnWindow::Day0 => 0,
            ReturnWindow::Day1 => 1,
            ReturnWindow::Day5 => 5,
            ReturnWindow::Day22 => 22,
            ReturnWindow::Day91 => 91,
            ReturnWindow::Day252 => 252,
        }
    }

    /// Column suffix shared by the IPO and benchmark columns.
    pub const fn column_suffix(self) -> &'static str {
        match self {
            ReturnWindow::Day0 => "day0_OTC",
            ReturnWindow::Day1 => "1day_ret",
            ReturnWindow::Day5 => "5day_ret",
            ReturnWindow::Day22 => "22day_ret",
            ReturnWindow::Day91 => "91day_ret",
            ReturnWindow::Day252 => "252day_ret",
        }
    }

    /// Input column holding the IPO's own return, e.g. `sym_22day_ret`.
    pub fn ipo_column(self) -> String {
        format!("sym_{}", self.column_suffix())
    }

    /// Input column holding the benchmark return, e.g. `iwv_22day_ret`.
    pub fn benchmark_column(self) -> String {
        format!("iwv_{}", self.column_suffix())
    }

    /// Short label used in tables and chart axes.
    pub const fn label(self) -> &'static str {
        match self {
            ReturnWindow::Day0 => "Day 0",
            ReturnWindow::Day1 => "1-day",
            ReturnWindow::Day5 => "5-day",
            ReturnWindow::Day22 => "22-day",
            ReturnWindow::Day91 => "91-day",
            ReturnWindow::Day252 => "252-day",
        }
    }

    /// Longer label with the calendar equivalent, for narrative text.
    pub const fn long_label(self) -> &'static str {
        match self {
            ReturnWindow::Day0 => "Day 0 (IPO date)",
            ReturnWindow::Day1 => "1-day",
            ReturnWindow::Day5 => "5-day (1 week)",
            ReturnWindow::Day22 => "22-day (1 month)",
            ReturnWindow::Day91 => "91-day (3 months)",
            ReturnWindow::Day252 => "252-day (1 year)",
        }
    }
}

impl fmt::Display for ReturnWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_match_input_layout() {
        assert_eq!(ReturnWindow::Day0.ipo_column(), "sym_day0_OTC");
        assert_eq!(ReturnWindow::Day0.benchmark_column(), "iwv_day0_OTC");
        assert_eq!(ReturnWindow::Day252.ipo_column(), "sym_252day_ret");
        assert_eq!(ReturnWindow::Day5.benchmark_column(), "iwv_5day_ret");
    }

    #[test]
    fn index_matches_position_in_all() {
        for (i, w) in ReturnWindow::ALL.iter().enumerate() {
            assert_eq!(w.index(), i);
        }
    }

    #[test]
    fn study_windows_skip_one_day() {
        assert_eq!(ReturnWindow::STUDY.len(), 5);
        assert!(!ReturnWindow::STUDY.contains(&ReturnWindow::Day1));
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&ReturnWindow::STUDY).unwrap();
        assert_eq!(json, r#"["day0","day5","day22","day91","day252"]"#);
        let back: ReturnWindow = serde_json::from_str("\"day22\"").unwrap();
        assert_eq!(back, ReturnWindow::Day22);
    }
}
