//! The IPO study: load inputs, derive flags, compute every result section.
//!
//! `run_study` is the single entry point. It never writes files; charts,
//! exports and documents are produced from the returned [`Study`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

use ipolens_core::stats::{
    count_by, filtered_mean, group_summaries, ols, welch_t_test, CorrelationMatrix, OlsFit,
    Summary, WelchTest,
};
use ipolens_core::{
    eleven_month_return, AnnotatedIpo, Day0Level, Flag, ReferenceList, ReferenceSet, ReturnWindow,
};

use crate::config::StudyConfig;
use crate::data_loader::{load_ipos, load_reference_list, LoadError, LoadOptions};

/// Current schema version for exported study results.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors that stop a study run.
#[derive(Debug, Error)]
pub enum StudyError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("required reference list '{name}' failed to load: {source}")]
    ReferenceList {
        name: &'static str,
        #[source]
        source: LoadError,
    },

    #[error("no IPO records with a date in {0}")]
    NoRecords(PathBuf),
}

/// Annotated rows plus the computed result.
#[derive(Debug, Clone)]
pub struct Study {
    pub rows: Vec<AnnotatedIpo>,
    pub result: StudyResult,
}

/// Every number the reports are built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyResult {
    pub schema_version: u32,
    pub overview: Overview,
    pub spac_by_year: Option<Vec<YearCount>>,
    pub spac_index_overlap: Option<SpacIndexOverlap>,
    pub returns_vs_benchmark: Vec<WindowComparison>,
    pub predictive: Predictive,
    pub day0: Option<Day0Analysis>,
    pub windows_by_spac: Option<Vec<WindowBySpac>>,
    pub inclusion: Inclusion,
    pub index_comparison: Option<IndexComparison>,
}

// ─── Result sections ────────────────────────────────────────────────

/// Yes/no split of one membership flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagCount {
    pub yes: usize,
    pub no: usize,
}

impl FlagCount {
    pub fn total(&self) -> usize {
        self.yes + self.no
    }

    /// Fraction of rows flagged yes; 0.0 when empty.
    pub fn share(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.yes as f64 / self.total() as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub source: PathBuf,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub rows_kept: usize,
    pub first_ipo: Option<NaiveDate>,
    pub last_ipo: Option<NaiveDate>,
    pub dataset_hash: String,
    pub spac: Option<FlagCount>,
    pub sp500: Option<FlagCount>,
    pub russell1000: Option<FlagCount>,
    pub day0_abnormal_threshold: f64,
    pub regression_outlier_cutoff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub spac: usize,
    pub non_spac: usize,
}

/// Index membership among SPAC IPOs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacIndexOverlap {
    pub spacs: usize,
    pub sp500: Option<FlagCount>,
    pub russell1000: Option<FlagCount>,
}

/// IPO vs benchmark returns over one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowComparison {
    pub window: ReturnWindow,
    pub ipo: Summary,
    pub benchmark: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictive {
    /// Correlation of the six IPO return windows.
    pub correlations: CorrelationMatrix,
    /// 252-day return on 22-day return, all rows.
    pub full_fit: Option<OlsFit>,
    /// Same regression on rows with a 22-day return below the cutoff.
    pub filtered_fit: Option<OlsFit>,
    pub original_rows: usize,
    pub filtered_rows: usize,
    /// Rows dropped for a 22-day return at or above the cutoff.
    #[serde(default)]
    pub outlier_rows: usize,
    /// Rows dropped for having no 22-day return.
    #[serde(default)]
    pub missing_rows: usize,
    /// 22-day, 252-day and 11-month returns on the filtered rows.
    pub filtered_correlations: CorrelationMatrix,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Day0Group {
    pub level: Day0Level,
    pub spac: Flag,
    pub summary: Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlagSummary {
    pub flag: Flag,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day0Analysis {
    pub by_level: Vec<Day0Group>,
    pub by_spac: Vec<FlagSummary>,
    /// SPAC minus non-SPAC mean day-0 return.
    pub welch: Option<WelchTest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowBySpac {
    pub window: ReturnWindow,
    pub spac: Summary,
    pub non_spac: Summary,
    /// SPAC minus non-SPAC mean return.
    pub welch: Option<WelchTest>,
}

/// 252-day returns split by index membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inclusion {
    pub sp500: Option<Vec<FlagSummary>>,
    pub russell1000: Option<Vec<FlagSummary>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupMean {
    pub count: usize,
    pub mean: Option<f64>,
}

/// Mean 252-day return by index group. The S&P 500 and Russell 1000
/// groups overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexComparison {
    pub neither: GroupMean,
    pub sp500: GroupMean,
    pub russell1000: GroupMean,
}

impl StudyResult {
    /// The `by_spac` summary for one flag, if present.
    pub fn day0_for(&self, flag: Flag) -> Option<&Summary> {
        self.day0
            .as_ref()?
            .by_spac
            .iter()
            .find(|g| g.flag == flag)
            .map(|g| &g.summary)
    }
}

// ─── Pipeline ───────────────────────────────────────────────────────

/// Load the inputs named in `config` and compute the full study.
pub fn run_study(config: &StudyConfig) -> Result<Study, StudyError> {
    let inputs = &config.inputs;
    let loaded = load_ipos(
        &inputs.ipos,
        &LoadOptions {
            symbol_column: inputs.symbol_column.clone(),
            date_column: inputs.date_column.clone(),
        },
    )?;
    if loaded.records.is_empty() {
        return Err(StudyError::NoRecords(inputs.ipos.clone()));
    }

    let required = config.analysis.require_reference_lists;
    let load = |name: &'static str, path: &PathBuf| -> Result<Option<ReferenceList>, StudyError> {
        match load_reference_list(name, path, &inputs.symbol_column) {
            Ok(list) => Ok(Some(list)),
            Err(source) if required => Err(StudyError::ReferenceList { name, source }),
            Err(e) => {
                error!(list = name, error = %e, "reference list unavailable; dependent sections skipped");
                Ok(None)
            }
        }
    };
    let references = ReferenceSet {
        spacs: load("spacs", &inputs.spacs)?,
        sp500: load("sp500", &inputs.sp500)?,
        russell1000: load("russell1000", &inputs.russell1000)?,
        day0_abnormal_threshold: config.analysis.day0_abnormal_threshold,
    };

    let rows = references.annotate(loaded.records);
    let overview = Overview {
        source: inputs.ipos.clone(),
        rows_read: loaded.rows_read,
        rows_dropped: loaded.rows_dropped,
        rows_kept: rows.len(),
        first_ipo: rows.iter().map(|r| r.record.ipo_date).min(),
        last_ipo: rows.iter().map(|r| r.record.ipo_date).max(),
        dataset_hash: loaded.dataset_hash,
        spac: flag_count(&rows, |m| m.membership.spac),
        sp500: flag_count(&rows, |m| m.membership.sp500),
        russell1000: flag_count(&rows, |m| m.membership.russell1000),
        day0_abnormal_threshold: config.analysis.day0_abnormal_threshold,
        regression_outlier_cutoff: config.analysis.regression_outlier_cutoff,
    };

    let result = compute(&rows, overview, config.analysis.regression_outlier_cutoff);
    info!(
        rows = rows.len(),
        spacs = result.overview.spac.map(|c| c.yes),
        "study complete"
    );
    Ok(Study { rows, result })
}

/// Compute every section from annotated rows.
pub fn compute(rows: &[AnnotatedIpo], overview: Overview, outlier_cutoff: f64) -> StudyResult {
    let has_spac = overview.spac.is_some();
    let has_sp = overview.sp500.is_some();
    let has_russell = overview.russell1000.is_some();

    StudyResult {
        schema_version: SCHEMA_VERSION,
        spac_by_year: has_spac.then(|| spac_by_year(rows)),
        spac_index_overlap: has_spac.then(|| spac_index_overlap(rows)),
        returns_vs_benchmark: returns_vs_benchmark(rows),
        predictive: predictive(rows, outlier_cutoff),
        day0: has_spac.then(|| day0_analysis(rows)),
        windows_by_spac: has_spac.then(|| windows_by_spac(rows)),
        inclusion: Inclusion {
            sp500: has_sp.then(|| by_flag(rows, |r| r.membership.sp500, ReturnWindow::Day252)),
            russell1000: has_russell
                .then(|| by_flag(rows, |r| r.membership.russell1000, ReturnWindow::Day252)),
        },
        index_comparison: (has_sp && has_russell).then(|| index_comparison(rows)),
        overview,
    }
}

fn flag_count<F>(rows: &[AnnotatedIpo], flag: F) -> Option<FlagCount>
where
    F: Fn(&AnnotatedIpo) -> Option<Flag>,
{
    // A flag is either present on every row or on none.
    rows.first().and_then(&flag)?;
    let counts = count_by(rows, flag);
    Some(FlagCount {
        yes: counts.get(&Flag::Yes).copied().unwrap_or(0),
        no: counts.get(&Flag::No).copied().unwrap_or(0),
    })
}

fn spac_by_year(rows: &[AnnotatedIpo]) -> Vec<YearCount> {
    let counts = count_by(rows, |r| r.membership.spac.map(|s| (r.record.year(), s)));
    let mut years: Vec<YearCount> = Vec::new();
    for ((year, flag), n) in counts {
        if years.last().map(|y| y.year) != Some(year) {
            years.push(YearCount {
                year,
                spac: 0,
                non_spac: 0,
            });
        }
        if let Some(entry) = years.last_mut() {
            match flag {
                Flag::Yes => entry.spac = n,
                Flag::No => entry.non_spac = n,
            }
        }
    }
    years
}

fn spac_index_overlap(rows: &[AnnotatedIpo]) -> SpacIndexOverlap {
    let spacs: Vec<AnnotatedIpo> = rows
        .iter()
        .filter(|r| r.membership.spac == Some(Flag::Yes))
        .cloned()
        .collect();
    let split = |flag: fn(&AnnotatedIpo) -> Option<Flag>| {
        rows.first().and_then(flag).map(|_| {
            let counts = count_by(&spacs, flag);
            FlagCount {
                yes: counts.get(&Flag::Yes).copied().unwrap_or(0),
                no: counts.get(&Flag::No).copied().unwrap_or(0),
            }
        })
    };
    SpacIndexOverlap {
        spacs: spacs.len(),
        sp500: split(|r| r.membership.sp500),
        russell1000: split(|r| r.membership.russell1000),
    }
}

fn returns_vs_benchmark(rows: &[AnnotatedIpo]) -> Vec<WindowComparison> {
    ReturnWindow::ALL
        .iter()
        .map(|&window| WindowComparison {
            window,
            ipo: Summary::from_values(rows.iter().map(|r| r.record.ipo_return(window))),
            benchmark: Summary::from_values(rows.iter().map(|r| r.record.benchmark_return(window))),
        })
        .collect()
}

fn column(rows: &[AnnotatedIpo], window: ReturnWindow) -> Vec<Option<f64>> {
    rows.iter().map(|r| r.ipo_return(window)).collect()
}

fn predictive(rows: &[AnnotatedIpo], outlier_cutoff: f64) -> Predictive {
    let correlations = CorrelationMatrix::compute(
        &ReturnWindow::ALL
            .iter()
            .map(|&w| (w.ipo_column(), column(rows, w)))
            .collect::<Vec<_>>(),
    );

    let r22 = column(rows, ReturnWindow::Day22);
    let r252 = column(rows, ReturnWindow::Day252);
    let full_fit = ols(&r22, &r252);

    // A missing 22-day return fails the comparison, so the row is dropped.
    let (f22, f252): (Vec<_>, Vec<_>) = r22
        .iter()
        .zip(&r252)
        .filter(|(x, _)| x.is_some_and(|v| v < outlier_cutoff))
        .map(|(x, y)| (*x, *y))
        .unzip();
    let filtered_fit = ols(&f22, &f252);
    let missing_rows = r22.iter().filter(|x| x.is_none()).count();
    let outlier_rows = rows.len() - f22.len() - missing_rows;
    let f11: Vec<Option<f64>> = f22
        .iter()
        .zip(&f252)
        .map(|(a, b)| eleven_month_return(*a, *b))
        .collect();

    let filtered_correlations = CorrelationMatrix::compute(&[
        (ReturnWindow::Day22.ipo_column(), f22.clone()),
        (ReturnWindow::Day252.ipo_column(), f252),
        ("sym_22_252_ret".to_string(), f11),
    ]);

    Predictive {
        correlations,
        full_fit,
        filtered_fit,
        original_rows: rows.len(),
        filtered_rows: f22.len(),
        outlier_rows,
        missing_rows,
        filtered_correlations,
    }
}

fn by_flag<F>(rows: &[AnnotatedIpo], flag: F, window: ReturnWindow) -> Vec<FlagSummary>
where
    F: Fn(&AnnotatedIpo) -> Option<Flag>,
{
    group_summaries(rows, flag, |r| r.ipo_return(window))
        .into_iter()
        .map(|(flag, summary)| FlagSummary { flag, summary })
        .collect()
}

fn spac_welch(rows: &[AnnotatedIpo], window: ReturnWindow) -> Option<WelchTest> {
    let values = |flag: Flag| -> Vec<f64> {
        rows.iter()
            .filter(|r| r.membership.spac == Some(flag))
            .filter_map(|r| r.ipo_return(window))
            .collect()
    };
    welch_t_test(&values(Flag::Yes), &values(Flag::No))
}

fn day0_analysis(rows: &[AnnotatedIpo]) -> Day0Analysis {
    let by_level = group_summaries(
        rows,
        |r| Some((r.membership.day0_level?, r.membership.spac?)),
        |r| r.ipo_return(ReturnWindow::Day0),
    )
    .into_iter()
    .map(|((level, spac), summary)| Day0Group {
        level,
        spac,
        summary,
    })
    .collect();

    Day0Analysis {
        by_level,
        by_spac: by_flag(rows, |r| r.membership.spac, ReturnWindow::Day0),
        welch: spac_welch(rows, ReturnWindow::Day0),
    }
}

fn windows_by_spac(rows: &[AnnotatedIpo]) -> Vec<WindowBySpac> {
    ReturnWindow::STUDY
        .iter()
        .map(|&window| {
            let groups = group_summaries(rows, |r| r.membership.spac, |r| r.ipo_return(window));
            WindowBySpac {
                window,
                spac: groups.get(&Flag::Yes).copied().unwrap_or_default(),
                non_spac: groups.get(&Flag::No).copied().unwrap_or_default(),
                welch: spac_welch(rows, window),
            }
        })
        .collect()
}

fn index_comparison(rows: &[AnnotatedIpo]) -> IndexComparison {
    let group = |filter: &dyn Fn(&AnnotatedIpo) -> bool| GroupMean {
        count: rows.iter().filter(|r| filter(r)).count(),
        mean: filtered_mean(rows, filter, |r| r.ipo_return(ReturnWindow::Day252)),
    };
    IndexComparison {
        neither: group(&|r| r.membership.in_no_index() == Some(true)),
        sp500: group(&|r| r.membership.sp500 == Some(Flag::Yes)),
        russell1000: group(&|r| r.membership.russell1000 == Some(Flag::Yes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipolens_core::{IpoRecord, Membership};

    #[allow(clippy::too_many_arguments)]
    fn row(symbol: &str, year: i32, spac: Flag, sp: Flag, russ: Flag, day0: f64, r22: f64, r252: f64) -> AnnotatedIpo {
        let record = IpoRecord::new(symbol, NaiveDate::from_ymd_opt(year, 3, 1).unwrap())
            .with_return(ReturnWindow::Day0, day0)
            .with_return(ReturnWindow::Day22, r22)
            .with_return(ReturnWindow::Day252, r252)
            .with_benchmark(ReturnWindow::Day252, 0.1);
        AnnotatedIpo {
            membership: Membership {
                spac: Some(spac),
                sp500: Some(sp),
                russell1000: Some(russ),
                day0_level: ipolens_core::classify_day0(Some(day0), 1.0),
            },
            record,
        }
    }

    fn fixture() -> Vec<AnnotatedIpo> {
        use Flag::{No, Yes};
        vec![
            row("A", 2020, Yes, No, No, 0.0, 0.01, -0.20),
            row("B", 2020, Yes, No, Yes, 0.02, 0.00, -0.40),
            row("C", 2021, Yes, No, No, 0.01, 0.02, -0.30),
            row("D", 2020, No, Yes, Yes, 0.30, 0.10, 0.50),
            row("E", 2021, No, No, Yes, 1.50, 0.20, 0.10),
            row("F", 2021, No, No, No, 0.10, 6.00, 9.00),
        ]
    }

    fn overview(rows: &[AnnotatedIpo]) -> Overview {
        Overview {
            source: PathBuf::from("fixture.csv"),
            rows_read: rows.len(),
            rows_dropped: 0,
            rows_kept: rows.len(),
            first_ipo: None,
            last_ipo: None,
            dataset_hash: String::new(),
            spac: flag_count(rows, |r| r.membership.spac),
            sp500: flag_count(rows, |r| r.membership.sp500),
            russell1000: flag_count(rows, |r| r.membership.russell1000),
            day0_abnormal_threshold: 1.0,
            regression_outlier_cutoff: 5.0,
        }
    }

    #[test]
    fn flag_counts_and_share() {
        let rows = fixture();
        let ov = overview(&rows);
        assert_eq!(ov.spac, Some(FlagCount { yes: 3, no: 3 }));
        assert_eq!(ov.sp500, Some(FlagCount { yes: 1, no: 5 }));
        assert!((ov.spac.unwrap().share() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn spac_counts_per_year() {
        let rows = fixture();
        let years = spac_by_year(&rows);
        assert_eq!(
            years,
            vec![
                YearCount { year: 2020, spac: 2, non_spac: 1 },
                YearCount { year: 2021, spac: 1, non_spac: 2 },
            ]
        );
    }

    #[test]
    fn overlap_counts_only_spacs() {
        let overlap = spac_index_overlap(&fixture());
        assert_eq!(overlap.spacs, 3);
        assert_eq!(overlap.sp500, Some(FlagCount { yes: 0, no: 3 }));
        assert_eq!(overlap.russell1000, Some(FlagCount { yes: 1, no: 2 }));
    }

    #[test]
    fn day0_mean_of_known_spac_group() {
        let result = compute(&fixture(), overview(&fixture()), 5.0);
        let spac = result.day0_for(Flag::Yes).unwrap();
        assert_eq!(spac.count, 3);
        assert!((spac.mean.unwrap() - 0.01).abs() < 1e-12);

        let day0 = result.day0.unwrap();
        let abnormal: Vec<_> = day0
            .by_level
            .iter()
            .filter(|g| g.level == Day0Level::Abnormal)
            .collect();
        assert_eq!(abnormal.len(), 1);
        assert_eq!(abnormal[0].spac, Flag::No);
        assert_eq!(abnormal[0].summary.count, 1);
    }

    #[test]
    fn filtered_regression_drops_outliers() {
        let result = compute(&fixture(), overview(&fixture()), 5.0);
        let p = &result.predictive;
        assert_eq!(p.original_rows, 6);
        assert_eq!(p.filtered_rows, 5);
        assert_eq!(p.full_fit.unwrap().observations, 6);
        assert_eq!(p.filtered_fit.unwrap().observations, 5);
        assert_eq!(p.correlations.labels.len(), 6);
        assert_eq!(p.filtered_correlations.labels[2], "sym_22_252_ret");
        assert_eq!(p.outlier_rows, 1);
        assert_eq!(p.missing_rows, 0);
    }

    #[test]
    fn missing_first_month_return_is_not_an_outlier() {
        let mut rows = fixture();
        rows[0].record.set_ipo_return(ReturnWindow::Day22, None);
        rows[1].record.set_ipo_return(ReturnWindow::Day22, None);
        let result = compute(&rows, overview(&rows), 5.0);
        let p = &result.predictive;
        assert_eq!(p.filtered_rows, 3);
        assert_eq!(p.outlier_rows, 1);
        assert_eq!(p.missing_rows, 2);
        assert_eq!(p.filtered_rows + p.outlier_rows + p.missing_rows, p.original_rows);
    }

    #[test]
    fn index_comparison_groups() {
        let cmp = index_comparison(&fixture());
        // neither: A, C, F
        assert_eq!(cmp.neither.count, 3);
        assert!((cmp.neither.mean.unwrap() - (-0.2 - 0.3 + 9.0) / 3.0).abs() < 1e-12);
        assert_eq!(cmp.sp500.count, 1);
        assert!((cmp.sp500.mean.unwrap() - 0.5).abs() < 1e-12);
        // russell: B, D, E
        assert_eq!(cmp.russell1000.count, 3);
        assert!((cmp.russell1000.mean.unwrap() - (-0.4 + 0.5 + 0.1) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn missing_spac_list_skips_dependent_sections() {
        let mut rows = fixture();
        for r in &mut rows {
            r.membership.spac = None;
        }
        let result = compute(&rows, overview(&rows), 5.0);
        assert!(result.overview.spac.is_none());
        assert!(result.spac_by_year.is_none());
        assert!(result.day0.is_none());
        assert!(result.windows_by_spac.is_none());
        assert!(result.inclusion.sp500.is_some());
        assert!(result.index_comparison.is_some());
    }

    #[test]
    fn windows_by_spac_covers_study_windows() {
        let result = compute(&fixture(), overview(&fixture()), 5.0);
        let windows = result.windows_by_spac.unwrap();
        assert_eq!(windows.len(), ReturnWindow::STUDY.len());
        let one_year = windows.iter().find(|w| w.window == ReturnWindow::Day252).unwrap();
        assert!((one_year.spac.mean.unwrap() - (-0.3)).abs() < 1e-12);
        assert_eq!(one_year.non_spac.count, 3);
    }
}
