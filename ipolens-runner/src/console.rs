//! Terminal summary of a study run.

use std::fmt::Write;

use crate::reporting::tables::{self, StatTable};
use crate::study::StudyResult;

/// Print the study summary to stdout.
pub fn print_study(result: &StudyResult) {
    print!("{}", format_study(result));
}

/// The text printed by [`print_study`].
pub fn format_study(result: &StudyResult) -> String {
    let mut out = String::new();
    let o = &result.overview;

    let _ = writeln!(out);
    let _ = writeln!(out, "=== IPO Study ===");
    let _ = writeln!(out, "Source:         {}", o.source.display());
    let _ = writeln!(
        out,
        "Rows:           {} read, {} dropped, {} kept",
        o.rows_read, o.rows_dropped, o.rows_kept
    );
    if let (Some(first), Some(last)) = (o.first_ipo, o.last_ipo) {
        let _ = writeln!(out, "Period:         {first} to {last}");
    }
    let _ = writeln!(out, "Dataset hash:   {}", short_hash(&o.dataset_hash));
    let _ = writeln!(out, "Day-0 cutoff:   {:.2}", o.day0_abnormal_threshold);

    for table in study_tables(result) {
        section(&mut out, &table);
    }

    let missing: Vec<&str> = [
        ("SPAC", o.spac.is_none()),
        ("S&P 500", o.sp500.is_none()),
        ("Russell 1000", o.russell1000.is_none()),
    ]
    .iter()
    .filter(|(_, missing)| *missing)
    .map(|(name, _)| *name)
    .collect();
    if !missing.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "WARNING: reference lists unavailable: {}",
            missing.join(", ")
        );
    }
    let _ = writeln!(out);
    out
}

/// Every table the study produces, in reading order.
pub fn study_tables(result: &StudyResult) -> Vec<StatTable> {
    let mut out = vec![tables::overview_table(&result.overview)];
    if let Some(years) = &result.spac_by_year {
        out.push(tables::spac_by_year_table(years));
    }
    if let Some(overlap) = &result.spac_index_overlap {
        out.push(tables::spac_overlap_table(overlap));
    }
    out.push(tables::benchmark_table(&result.returns_vs_benchmark));
    out.push(tables::correlation_table(
        "Correlation of IPO returns",
        &result.predictive.correlations,
    ));
    out.push(tables::regression_table(&result.predictive));
    out.push(tables::correlation_table(
        "Correlation with the 11-month return (filtered)",
        &result.predictive.filtered_correlations,
    ));
    if let Some(day0) = &result.day0 {
        out.push(tables::day0_level_table(day0));
        out.push(tables::flag_summary_table(
            "Day 0 returns by SPAC status",
            &day0.by_spac,
            tables::spac_label,
        ));
    }
    if let Some(windows) = &result.windows_by_spac {
        out.push(tables::windows_table(windows));
    }
    if let Some(sp) = &result.inclusion.sp500 {
        out.push(tables::flag_summary_table(
            "S&P 500 inclusion: 1-year return",
            sp,
            tables::inclusion_label,
        ));
    }
    if let Some(russ) = &result.inclusion.russell1000 {
        out.push(tables::flag_summary_table(
            "Russell 1000 inclusion: 1-year return",
            russ,
            tables::inclusion_label,
        ));
    }
    if let Some(cmp) = &result.index_comparison {
        out.push(tables::index_comparison_table(cmp));
    }
    out
}

fn section(out: &mut String, table: &StatTable) {
    let _ = writeln!(out);
    let _ = writeln!(out, "--- {} ---", table.title);
    out.push_str(&table.to_text());
    if let Some(note) = &table.note {
        let _ = writeln!(out, "({note})");
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::{compute, Overview};
    use chrono::NaiveDate;
    use ipolens_core::{AnnotatedIpo, Flag, IpoRecord, Membership, ReturnWindow};
    use std::path::PathBuf;

    fn result(with_lists: bool) -> StudyResult {
        let flag = |f: Flag| with_lists.then_some(f);
        let rows: Vec<AnnotatedIpo> = (0..6)
            .map(|i| AnnotatedIpo {
                record: IpoRecord::new(format!("S{i}"), NaiveDate::from_ymd_opt(2020 + i % 2, 1, 2).unwrap())
                    .with_return(ReturnWindow::Day0, 0.1 * i as f64)
                    .with_return(ReturnWindow::Day22, 0.05 * i as f64)
                    .with_return(ReturnWindow::Day252, 0.2 - 0.1 * i as f64),
                membership: Membership {
                    spac: flag(Flag::from_bool(i % 2 == 0)),
                    sp500: flag(Flag::from_bool(i == 1)),
                    russell1000: flag(Flag::from_bool(i < 3)),
                    day0_level: None,
                },
            })
            .collect();
        let yes_no = |yes| with_lists.then_some(crate::study::FlagCount { yes, no: 6 - yes });
        let overview = Overview {
            source: PathBuf::from("ipos.csv"),
            rows_read: 7,
            rows_dropped: 1,
            rows_kept: 6,
            first_ipo: NaiveDate::from_ymd_opt(2020, 1, 2),
            last_ipo: NaiveDate::from_ymd_opt(2021, 1, 2),
            dataset_hash: "0123456789abcdef0123".into(),
            spac: yes_no(3),
            sp500: yes_no(1),
            russell1000: yes_no(3),
            day0_abnormal_threshold: 1.0,
            regression_outlier_cutoff: 5.0,
        };
        compute(&rows, overview, 5.0)
    }

    #[test]
    fn summary_lists_every_section() {
        let text = format_study(&result(true));
        assert!(text.contains("=== IPO Study ==="));
        assert!(text.contains("7 read, 1 dropped, 6 kept"));
        assert!(text.contains("Dataset hash:   0123456789abcdef\n"));
        assert!(text.contains("--- IPOs by year ---"));
        assert!(text.contains("--- Mean 1-year return by index group ---"));
        assert!(!text.contains("WARNING"));
    }

    #[test]
    fn missing_lists_are_reported() {
        let text = format_study(&result(false));
        assert!(!text.contains("--- IPOs by year ---"));
        assert!(text.contains("WARNING: reference lists unavailable: SPAC, S&P 500, Russell 1000"));
    }
}
