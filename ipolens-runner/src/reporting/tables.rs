//! Statistical tables shared by the console summary and every renderer.
//!
//! Each builder turns one section of a [`StudyResult`] into a [`StatTable`]
//! of preformatted cells, so all outputs show identical numbers.

use ipolens_core::stats::{CorrelationMatrix, OlsFit, Summary};
use ipolens_core::Flag;

use crate::study::{
    Day0Analysis, FlagSummary, IndexComparison, Overview, Predictive, SpacIndexOverlap,
    WindowBySpac, WindowComparison, YearCount,
};

/// A titled grid of text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct StatTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub note: Option<String>,
}

impl StatTable {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn push_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of each column, in characters.
    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    /// Fixed-width text: first column left-aligned, the rest right-aligned.
    pub fn to_text(&self) -> String {
        let widths = self.column_widths();
        let fmt_row = |cells: &[String]| {
            cells
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    let w = widths.get(i).copied().unwrap_or(0);
                    if i == 0 {
                        format!("{c:<w$}")
                    } else {
                        format!("{c:>w$}")
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        let header = fmt_row(&self.headers);
        let rule_len = header.chars().count();
        out.push_str(&header);
        out.push('\n');
        out.push_str(&"-".repeat(rule_len));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&fmt_row(row));
            out.push('\n');
        }
        out
    }
}

// ─── Cell formatting ────────────────────────────────────────────────

pub const MISSING: &str = "n/a";

/// Fraction as a percentage with two decimals: 0.1234 -> "12.34%".
pub fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{:.2}%", v * 100.0))
}

pub fn num(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.decimals$}"))
}

/// p-values below 0.0001 print as "<0.0001".
pub fn p_value(value: Option<f64>) -> String {
    match value {
        Some(p) if p < 1e-4 => "<0.0001".to_string(),
        other => num(other, 4),
    }
}

pub fn spac_label(flag: Flag) -> &'static str {
    match flag {
        Flag::Yes => "SPAC",
        Flag::No => "Non-SPAC",
    }
}

pub fn inclusion_label(flag: Flag) -> &'static str {
    match flag {
        Flag::Yes => "Included",
        Flag::No => "Not included",
    }
}

fn summary_cells(s: &Summary) -> Vec<String> {
    vec![
        s.count.to_string(),
        pct(s.mean),
        pct(s.median),
        pct(s.std),
        pct(s.min),
        pct(s.max),
    ]
}

const SUMMARY_HEADERS: [&str; 6] = ["Count", "Mean", "Median", "Std", "Min", "Max"];

// ─── Builders ───────────────────────────────────────────────────────

pub fn overview_table(o: &Overview) -> StatTable {
    let mut t = StatTable::new("Dataset overview", &["Metric", "Value"]);
    let mut add = |k: &str, v: String| t.push_row(vec![k.to_string(), v]);
    add("Rows read", o.rows_read.to_string());
    add("Rows dropped (no IPO date)", o.rows_dropped.to_string());
    add("IPOs analysed", o.rows_kept.to_string());
    if let (Some(first), Some(last)) = (o.first_ipo, o.last_ipo) {
        add("IPO date range", format!("{first} to {last}"));
    }
    let flag = |c: Option<crate::study::FlagCount>| {
        c.map_or_else(
            || "list unavailable".to_string(),
            |c| format!("{} ({:.1}%)", c.yes, c.share() * 100.0),
        )
    };
    add("SPAC IPOs", flag(o.spac));
    add("In S&P 500", flag(o.sp500));
    add("In Russell 1000", flag(o.russell1000));
    t
}

pub fn spac_by_year_table(years: &[YearCount]) -> StatTable {
    let mut t = StatTable::new("IPOs by year", &["Year", "SPAC", "Non-SPAC", "Total", "SPAC share"]);
    for y in years {
        let total = y.spac + y.non_spac;
        let share = (total > 0).then(|| y.spac as f64 / total as f64);
        t.push_row(vec![
            y.year.to_string(),
            y.spac.to_string(),
            y.non_spac.to_string(),
            total.to_string(),
            pct(share),
        ]);
    }
    t
}

pub fn spac_overlap_table(o: &SpacIndexOverlap) -> StatTable {
    let mut t = StatTable::new("SPACs in major indices", &["Index", "Included", "Not included"]);
    for (name, counts) in [("S&P 500", o.sp500), ("Russell 1000", o.russell1000)] {
        if let Some(c) = counts {
            t.push_row(vec![name.to_string(), c.yes.to_string(), c.no.to_string()]);
        }
    }
    t.with_note(format!("{} SPAC IPOs in total", o.spacs))
}

pub fn benchmark_table(rows: &[WindowComparison]) -> StatTable {
    let mut t = StatTable::new(
        "IPO vs Russell 3000 (IWV) returns",
        &["Window", "N", "IPO mean", "IWV mean", "IPO median", "IWV median", "IPO std", "IWV std"],
    );
    for r in rows {
        t.push_row(vec![
            r.window.label().to_string(),
            r.ipo.count.to_string(),
            pct(r.ipo.mean),
            pct(r.benchmark.mean),
            pct(r.ipo.median),
            pct(r.benchmark.median),
            pct(r.ipo.std),
            pct(r.benchmark.std),
        ]);
    }
    t
}

pub fn correlation_table(title: &str, m: &CorrelationMatrix) -> StatTable {
    let mut headers = vec![""];
    headers.extend(m.labels.iter().map(|l| l.as_str()));
    let mut t = StatTable::new(title, &headers);
    for (label, row) in m.labels.iter().zip(&m.values) {
        let mut cells = vec![label.clone()];
        cells.extend(row.iter().map(|v| num(*v, 3)));
        t.push_row(cells);
    }
    t
}

pub fn regression_table(p: &Predictive) -> StatTable {
    let mut t = StatTable::new(
        "Regression of 1-year on 1-month return",
        &["Sample", "N", "Intercept", "Slope", "Slope t", "Slope p", "R-squared"],
    );
    let mut add = |name: &str, fit: Option<&OlsFit>| match fit {
        Some(f) => t.push_row(vec![
            name.to_string(),
            f.observations.to_string(),
            num(Some(f.intercept.estimate), 4),
            num(Some(f.slope.estimate), 4),
            num(f.slope.t_statistic, 2),
            p_value(f.slope.p_value),
            num(Some(f.r_squared), 4),
        ]),
        None => t.push_row(vec![
            name.to_string(),
            "0".to_string(),
            MISSING.to_string(),
            MISSING.to_string(),
            MISSING.to_string(),
            MISSING.to_string(),
            MISSING.to_string(),
        ]),
    };
    add("Full sample", p.full_fit.as_ref());
    add("Filtered", p.filtered_fit.as_ref());
    t.with_note(format!(
        "Filtered sample keeps {} of {} rows ({} above the cutoff, {} without a 22-day return)",
        p.filtered_rows, p.original_rows, p.outlier_rows, p.missing_rows
    ))
}

pub fn day0_level_table(d: &Day0Analysis) -> StatTable {
    let mut headers = vec!["Level", "Group"];
    headers.extend(SUMMARY_HEADERS);
    let mut t = StatTable::new("Day 0 returns by level and SPAC status", &headers);
    for g in &d.by_level {
        let mut cells = vec![g.level.as_str().to_string(), spac_label(g.spac).to_string()];
        cells.extend(summary_cells(&g.summary));
        t.push_row(cells);
    }
    t
}

/// Summary rows for a yes/no split, labelled by `label`.
pub fn flag_summary_table(
    title: &str,
    groups: &[FlagSummary],
    label: fn(Flag) -> &'static str,
) -> StatTable {
    let mut headers = vec!["Group"];
    headers.extend(SUMMARY_HEADERS);
    let mut t = StatTable::new(title, &headers);
    for g in groups {
        let mut cells = vec![label(g.flag).to_string()];
        cells.extend(summary_cells(&g.summary));
        t.push_row(cells);
    }
    t
}

pub fn windows_table(windows: &[WindowBySpac]) -> StatTable {
    let mut t = StatTable::new(
        "Returns by window: SPAC vs non-SPAC",
        &[
            "Window",
            "SPAC mean",
            "Non-SPAC mean",
            "SPAC median",
            "Non-SPAC median",
            "SPAC std",
            "Non-SPAC std",
            "Welch p",
        ],
    );
    for w in windows {
        t.push_row(vec![
            w.window.label().to_string(),
            pct(w.spac.mean),
            pct(w.non_spac.mean),
            pct(w.spac.median),
            pct(w.non_spac.median),
            pct(w.spac.std),
            pct(w.non_spac.std),
            p_value(w.welch.map(|t| t.p_value)),
        ]);
    }
    t
}

pub fn index_comparison_table(c: &IndexComparison) -> StatTable {
    let mut t = StatTable::new(
        "Mean 1-year return by index group",
        &["Group", "Count", "Mean 1-year return"],
    );
    for (name, g) in [
        ("Not in either index", c.neither),
        ("S&P 500", c.sp500),
        ("Russell 1000", c.russell1000),
    ] {
        t.push_row(vec![name.to_string(), g.count.to_string(), pct(g.mean)]);
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting_helpers() {
        assert_eq!(pct(Some(0.1234)), "12.34%");
        assert_eq!(pct(None), "n/a");
        assert_eq!(num(Some(1.23456), 2), "1.23");
        assert_eq!(p_value(Some(0.00001)), "<0.0001");
        assert_eq!(p_value(Some(0.04321)), "0.0432");
    }

    #[test]
    fn text_rendering_aligns_columns() {
        let mut t = StatTable::new("t", &["Name", "Value"]);
        t.push_row(vec!["a".into(), "1".into()]);
        t.push_row(vec!["longer".into(), "100".into()]);
        let text = t.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Name    Value");
        assert_eq!(lines[1], "-------------");
        assert_eq!(lines[2], "a           1");
        assert_eq!(lines[3], "longer    100");
    }

    #[test]
    fn year_table_has_share() {
        let t = spac_by_year_table(&[YearCount { year: 2021, spac: 1, non_spac: 3 }]);
        assert_eq!(t.rows[0], vec!["2021", "1", "3", "4", "25.00%"]);
    }
}
