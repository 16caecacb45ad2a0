//! Format-neutral report document.
//!
//! `build_document` turns a [`StudyResult`] into headings, generated prose,
//! tables and figure references. Every renderer consumes the same document,
//! so the markdown, deck, DOCX and PDF outputs agree on content.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use ipolens_core::{Flag, ReturnWindow};

use crate::charts::ChartArtifact;
use crate::config::OutputConfig;
use crate::reporting::tables::{self, pct, StatTable};
use crate::study::{FlagSummary, StudyResult, WindowBySpac};

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Subheading(String),
    Paragraph(String),
    Bullets(Vec<String>),
    Table(StatTable),
    /// `path` is the vector chart relative to the documents; `raster` is
    /// the PNG that binary formats embed.
    Figure {
        path: PathBuf,
        caption: String,
        raster: Option<Raster>,
    },
}

/// A PNG chart on disk with its pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub file: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub blocks: Vec<Block>,
}

impl Section {
    fn new(heading: &str) -> Self {
        Self {
            heading: heading.to_string(),
            blocks: Vec::new(),
        }
    }

    fn paragraph(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Paragraph(text.into()));
    }

    fn table(&mut self, table: StatTable) {
        self.blocks.push(Block::Table(table));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub subtitle: String,
    /// Label/value lines shown under the title.
    pub metadata: Vec<(String, String)>,
    pub sections: Vec<Section>,
}

impl ReportDocument {
    pub fn tables(&self) -> impl Iterator<Item = &StatTable> {
        self.sections.iter().flat_map(|s| &s.blocks).filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    pub fn figures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.sections.iter().flat_map(|s| &s.blocks).filter_map(|b| match b {
            Block::Figure { path, caption, .. } => Some((path.as_path(), caption.as_str())),
            _ => None,
        })
    }
}

/// Title page details.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMeta {
    pub title: String,
    pub subtitle: String,
    pub author: Option<String>,
    pub date: NaiveDate,
    /// Directory of the chart files, relative to the documents.
    pub figure_dir: PathBuf,
}

impl ReportMeta {
    pub fn from_config(output: &OutputConfig, date: NaiveDate) -> Self {
        Self {
            title: output.title.clone(),
            subtitle: output.subtitle.clone(),
            author: output.author.clone(),
            date,
            figure_dir: PathBuf::from("charts"),
        }
    }
}

/// Build the full report document.
pub fn build_document(result: &StudyResult, charts: &[ChartArtifact], meta: &ReportMeta) -> ReportDocument {
    let figures = Figures { charts, dir: &meta.figure_dir };
    let o = &result.overview;

    let mut metadata = vec![("Date".to_string(), meta.date.format("%B %-d, %Y").to_string())];
    if let Some(author) = &meta.author {
        metadata.push(("Author".to_string(), author.clone()));
    }
    let file = o
        .source
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| o.source.display().to_string());
    metadata.push(("Dataset".to_string(), format!("{} IPOs ({file})", o.rows_kept)));

    ReportDocument {
        title: meta.title.clone(),
        subtitle: meta.subtitle.clone(),
        metadata,
        sections: vec![
            executive_summary(result),
            methodology(result, &figures),
            day0_section(result, &figures),
            windows_section(result, &figures),
            inclusion_section(result, &figures),
            predictive_section(result, &figures),
            conclusions(result),
            limitations(result),
        ],
    }
}

struct Figures<'a> {
    charts: &'a [ChartArtifact],
    dir: &'a Path,
}

impl Figures<'_> {
    fn push(&self, section: &mut Section, name: &str, caption: &str) {
        if let Some(chart) = self.charts.iter().find(|c| c.name == name) {
            let file = chart
                .path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(format!("{name}.svg")));
            section.blocks.push(Block::Figure {
                path: self.dir.join(file),
                caption: caption.to_string(),
                raster: Some(Raster {
                    file: chart.png.clone(),
                    width: chart.width,
                    height: chart.height,
                }),
            });
        }
    }
}

// ─── Narrative helpers ──────────────────────────────────────────────

fn direction(a: f64, b: f64) -> &'static str {
    if a > b {
        "higher"
    } else if a < b {
        "lower"
    } else {
        "the same"
    }
}

/// Difference in percentage points, e.g. "2.31 percentage points".
fn points(a: f64, b: f64) -> String {
    format!("{:.2} percentage points", (a - b).abs() * 100.0)
}

fn flag_mean(groups: &[FlagSummary], flag: Flag) -> Option<f64> {
    groups.iter().find(|g| g.flag == flag)?.summary.mean
}

/// Windows where the SPAC statistic is below the non-SPAC one.
fn spac_below(windows: &[WindowBySpac], stat: fn(&ipolens_core::Summary) -> Option<f64>) -> (usize, usize) {
    let comparable: Vec<(f64, f64)> = windows
        .iter()
        .filter_map(|w| Some((stat(&w.spac)?, stat(&w.non_spac)?)))
        .collect();
    let below = comparable.iter().filter(|(s, n)| s < n).count();
    (below, comparable.len())
}

fn significance(p: Option<f64>) -> &'static str {
    match p {
        Some(p) if p < 0.01 => "statistically significant at the 1% level",
        Some(p) if p < 0.05 => "statistically significant at the 5% level",
        Some(_) => "not statistically significant at the 5% level",
        None => "not testable on this sample",
    }
}

// ─── Sections ───────────────────────────────────────────────────────

fn executive_summary(result: &StudyResult) -> Section {
    let o = &result.overview;
    let mut s = Section::new("Executive Summary");

    let mut intro = format!(
        "This report examines the performance of {} initial public offerings",
        o.rows_kept
    );
    if let (Some(first), Some(last)) = (o.first_ipo, o.last_ipo) {
        intro.push_str(&format!(" listed between {first} and {last}"));
    }
    intro.push_str(
        ". It asks whether SPAC listings deliver different returns from traditional IPOs \
         across horizons from the IPO date to one year, and whether membership of the \
         S&P 500 or the Russell 1000 is associated with stronger one-year performance.",
    );
    if let Some(spac) = o.spac {
        intro.push_str(&format!(
            " The sample contains {} SPACs ({:.1}%) and {} traditional IPOs ({:.1}%).",
            spac.yes,
            spac.share() * 100.0,
            spac.no,
            (1.0 - spac.share()) * 100.0
        ));
    }
    s.paragraph(intro);

    let findings = key_findings(result);
    if !findings.is_empty() {
        s.blocks.push(Block::Subheading("Key findings".to_string()));
        s.blocks.push(Block::Bullets(findings));
    }
    s
}

fn key_findings(result: &StudyResult) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(windows) = &result.windows_by_spac {
        let (below, total) = spac_below(windows, |s| s.mean);
        if total > 0 {
            let verb = if below * 2 > total { "underperform" } else { "match or outperform" };
            out.push(format!(
                "SPACs {verb} traditional IPOs on mean return in {} of {total} return windows.",
                if below * 2 > total { below } else { total - below }
            ));
        }
        let (calmer, total) = spac_below(windows, |s| s.std);
        if total > 0 {
            out.push(format!(
                "SPAC returns are less volatile than traditional IPO returns in {calmer} of {total} windows."
            ));
        }
    }
    if let Some(cmp) = &result.index_comparison {
        if let (Some(sp), Some(none)) = (cmp.sp500.mean, cmp.neither.mean) {
            out.push(format!(
                "IPOs now in the S&P 500 returned {} on average over one year, against {} for IPOs in neither index.",
                pct(Some(sp)),
                pct(Some(none))
            ));
        }
        if let Some(russ) = cmp.russell1000.mean {
            out.push(format!(
                "Russell 1000 members averaged {} over the first year.",
                pct(Some(russ))
            ));
        }
    }
    let o = &result.overview;
    if let (Some(sp), Some(russ)) = (o.sp500, o.russell1000) {
        out.push(format!(
            "Index membership is selective: {:.1}% of IPOs are in the S&P 500 and {:.1}% in the Russell 1000.",
            sp.share() * 100.0,
            russ.share() * 100.0
        ));
    }
    if let Some(r) = result.predictive.correlations.get(
        &ReturnWindow::Day22.ipo_column(),
        &ReturnWindow::Day252.ipo_column(),
    ) {
        out.push(format!(
            "The first-month return correlates with the one-year return at {r:.3}."
        ));
    }
    out
}

fn methodology(result: &StudyResult, figures: &Figures<'_>) -> Section {
    let o = &result.overview;
    let mut s = Section::new("Methodology");
    s.paragraph(format!(
        "The IPO file lists one row per offering with the stock's return and the Russell 3000 \
         ETF (IWV) return over six windows measured from the IPO date. Of {} rows read, {} had \
         no IPO date and were dropped. SPAC status and index membership come from matching \
         ticker symbols exactly against the SPAC list and the current S&P 500 and Russell 1000 \
         constituent lists.",
        o.rows_read, o.rows_dropped
    ));
    s.paragraph(format!(
        "A day-0 return of {} or more is flagged abnormal. Statistics skip missing values, \
         standard deviations use the sample (n - 1) denominator, and group differences are \
         tested with Welch's unequal-variance t-test. The filtered regression keeps IPOs with \
         a 22-day return below {}.",
        pct(Some(o.day0_abnormal_threshold)),
        pct(Some(o.regression_outlier_cutoff))
    ));
    s.blocks.push(Block::Bullets(
        ReturnWindow::ALL
            .iter()
            .map(|w| format!("{}: `{}` vs `{}`", w.long_label(), w.ipo_column(), w.benchmark_column()))
            .collect(),
    ));
    s.table(tables::overview_table(o));

    let missing: Vec<&str> = [
        ("SPAC", o.spac.is_none()),
        ("S&P 500", o.sp500.is_none()),
        ("Russell 1000", o.russell1000.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, missing)| missing.then_some(name))
    .collect();
    if !missing.is_empty() {
        s.paragraph(format!(
            "The following reference lists could not be loaded, so the analyses that depend on \
             them are omitted: {}.",
            missing.join(", ")
        ));
    }

    if let Some(years) = &result.spac_by_year {
        s.blocks.push(Block::Subheading("SPAC listings over time".to_string()));
        if let Some(peak) = years.iter().max_by_key(|y| y.spac) {
            s.paragraph(format!(
                "SPAC listings peaked in {} with {} offerings, {} of that year's IPOs.",
                peak.year,
                peak.spac,
                pct(Some(peak.spac as f64 / (peak.spac + peak.non_spac).max(1) as f64))
            ));
        }
        s.table(tables::spac_by_year_table(years));
        figures.push(&mut s, "spac_counts_by_year", "Number of IPOs by year, SPAC vs non-SPAC");
    }
    if let Some(overlap) = &result.spac_index_overlap {
        s.table(tables::spac_overlap_table(overlap));
    }
    s
}

fn day0_section(result: &StudyResult, figures: &Figures<'_>) -> Section {
    let mut s = Section::new("Day 0 Return Analysis");
    let Some(day0) = &result.day0 else {
        s.paragraph("The SPAC list was unavailable, so day-0 returns are not split by SPAC status.");
        return s;
    };

    let spac = flag_mean(&day0.by_spac, Flag::Yes);
    let non = flag_mean(&day0.by_spac, Flag::No);
    let mut text = String::from(
        "The first trading day shows how the market receives a new listing. Returns are grouped \
         by day-0 level and SPAC status.",
    );
    if let (Some(spac), Some(non)) = (spac, non) {
        text.push_str(&format!(
            " SPACs averaged {} on day 0 against {} for traditional IPOs, {} by {}.",
            pct(Some(spac)),
            pct(Some(non)),
            direction(spac, non),
            points(spac, non)
        ));
    }
    let abnormal: usize = day0
        .by_level
        .iter()
        .filter(|g| g.level == ipolens_core::Day0Level::Abnormal)
        .map(|g| g.summary.count)
        .sum();
    let abnormal_spacs: usize = day0
        .by_level
        .iter()
        .filter(|g| g.level == ipolens_core::Day0Level::Abnormal && g.spac == Flag::Yes)
        .map(|g| g.summary.count)
        .sum();
    text.push_str(&format!(
        " {abnormal} IPOs had an abnormal first day, {abnormal_spacs} of them SPACs."
    ));
    s.paragraph(text);

    s.table(tables::day0_level_table(day0));
    s.table(tables::flag_summary_table(
        "Day 0 returns by SPAC status",
        &day0.by_spac,
        tables::spac_label,
    ));
    if let Some(w) = &day0.welch {
        s.paragraph(format!(
            "The day-0 difference (SPAC minus non-SPAC) of {} has t = {:.2} and p = {}, {}.",
            pct(Some(w.mean_difference)),
            w.t_statistic,
            tables::p_value(Some(w.p_value)),
            significance(Some(w.p_value))
        ));
    }
    figures.push(&mut s, "day0_comparison", "Day 0 mean returns and distribution, SPAC vs non-SPAC");
    s
}

fn windows_section(result: &StudyResult, figures: &Figures<'_>) -> Section {
    let mut s = Section::new("Multi-Window Return Analysis");
    s.blocks.push(Block::Subheading("IPOs against the market".to_string()));
    let one_year = result
        .returns_vs_benchmark
        .iter()
        .find(|w| w.window == ReturnWindow::Day252);
    if let Some(w) = one_year {
        if let (Some(ipo), Some(bench)) = (w.ipo.mean, w.benchmark.mean) {
            s.paragraph(format!(
                "Over one year the average IPO returned {} against {} for the Russell 3000 over \
                 the same dates; the median IPO returned {}.",
                pct(Some(ipo)),
                pct(Some(bench)),
                pct(w.ipo.median)
            ));
        }
    }
    s.table(tables::benchmark_table(&result.returns_vs_benchmark));

    let Some(windows) = &result.windows_by_spac else {
        return s;
    };
    s.blocks.push(Block::Subheading("SPAC vs traditional IPOs".to_string()));
    let (below, total) = spac_below(windows, |x| x.mean);
    let (calmer, _) = spac_below(windows, |x| x.std);
    s.paragraph(format!(
        "Across {total} windows from day 0 to one year, SPACs have the lower mean return in \
         {below} and the lower standard deviation in {calmer}. The Welch p-value column tests \
         whether the mean difference in each window is distinguishable from zero."
    ));
    s.table(tables::windows_table(windows));
    figures.push(&mut s, "multiwindow_comparison", "Mean returns across windows, SPAC vs non-SPAC");
    figures.push(&mut s, "volatility_comparison", "Return volatility across windows, SPAC vs non-SPAC");
    s
}

fn inclusion_section(result: &StudyResult, figures: &Figures<'_>) -> Section {
    let mut s = Section::new("Index Inclusion Analysis");
    s.paragraph(
        "Membership is taken from current constituent lists, so it reflects where an IPO ended \
         up rather than its status at listing. Returns below are one-year (252-day) returns.",
    );

    let indices = [
        ("S&P 500", &result.inclusion.sp500, "sp500_performance"),
        ("Russell 1000", &result.inclusion.russell1000, "russell1000_performance"),
    ];
    for (name, groups, chart) in indices {
        s.blocks.push(Block::Subheading(format!("{name} inclusion")));
        let Some(groups) = groups else {
            s.paragraph(format!("The {name} list was unavailable."));
            continue;
        };
        if let (Some(yes), Some(no)) = (flag_mean(groups, Flag::Yes), flag_mean(groups, Flag::No)) {
            s.paragraph(format!(
                "IPOs in the {name} returned {} on average over one year, {} than the {} for \
                 IPOs outside it (a gap of {}).",
                pct(Some(yes)),
                direction(yes, no),
                pct(Some(no)),
                points(yes, no)
            ));
        }
        s.table(tables::flag_summary_table(
            &format!("{name} inclusion: 1-year return"),
            groups,
            tables::inclusion_label,
        ));
        figures.push(&mut s, chart, &format!("{name} inclusion and 1-year returns"));
    }

    if let Some(cmp) = &result.index_comparison {
        s.blocks.push(Block::Subheading("Comparison".to_string()));
        s.table(tables::index_comparison_table(cmp));
        figures.push(&mut s, "index_comparison", "Mean 1-year return by index group");
    }
    s
}

fn predictive_section(result: &StudyResult, figures: &Figures<'_>) -> Section {
    let p = &result.predictive;
    let mut s = Section::new("Predictive Analysis");
    s.paragraph(
        "Do early returns predict later ones? The correlation matrix covers every IPO return \
         window, and a regression relates the one-year return to the first-month return.",
    );
    s.table(tables::correlation_table("Correlation of IPO returns", &p.correlations));
    s.table(tables::regression_table(p));

    if let (Some(full), Some(filtered)) = (&p.full_fit, &p.filtered_fit) {
        let mut text = format!(
            "On the full sample each extra point of first-month return goes with {:.3} points of \
             one-year return (R-squared {:.3}).",
            full.slope.estimate, full.r_squared,
        );
        if p.outlier_rows > 0 {
            text.push_str(&format!(
                " Dropping the {} IPOs with a first-month return of {} or more changes the slope \
                 to {:.3} (R-squared {:.3}).",
                p.outlier_rows,
                pct(Some(result.overview.regression_outlier_cutoff)),
                filtered.slope.estimate,
                filtered.r_squared
            ));
        } else {
            text.push_str(&format!(
                " No first-month return reaches the {} outlier cutoff, so the filtered fit \
                 (slope {:.3}) matches the full sample.",
                pct(Some(result.overview.regression_outlier_cutoff)),
                filtered.slope.estimate
            ));
        }
        if p.missing_rows > 0 {
            text.push_str(&format!(
                " {} IPOs without a first-month return are left out of both fits.",
                p.missing_rows
            ));
        }
        s.paragraph(text);
    }
    s.paragraph(
        "Because the one-year return contains the first month, part of that relationship is \
         mechanical. The 11-month return from day 22 to day 252 removes the overlap.",
    );
    s.table(tables::correlation_table(
        "Correlation with the 11-month return (filtered)",
        &p.filtered_correlations,
    ));
    if let Some(r) = p
        .filtered_correlations
        .get(&ReturnWindow::Day22.ipo_column(), "sym_22_252_ret")
    {
        s.paragraph(format!(
            "The first-month return correlates with the subsequent 11-month return at {r:.3}."
        ));
    }
    figures.push(&mut s, "scatter_22_252", "One-year return against first-month return");
    figures.push(&mut s, "scatter_22_252_11month", "11-month return against first-month return");
    s
}

fn conclusions(result: &StudyResult) -> Section {
    let mut s = Section::new("Conclusions");
    let mut bullets = key_findings(result);
    if let Some(day0) = &result.day0 {
        if let Some(w) = &day0.welch {
            bullets.push(format!(
                "The day-0 gap between SPACs and traditional IPOs is {}.",
                significance(Some(w.p_value))
            ));
        }
    }
    if bullets.is_empty() {
        s.paragraph("The available data supports no comparative conclusions.");
    } else {
        s.blocks.push(Block::Bullets(bullets));
    }
    s
}

fn limitations(result: &StudyResult) -> Section {
    let mut s = Section::new("Limitations");
    let mut bullets = vec![
        "Index membership uses current constituent lists, which introduces look-ahead and \
         survivorship bias into the inclusion comparison."
            .to_string(),
        "IPOs without a return for a window are excluded from that window only, so group sizes \
         differ across windows."
            .to_string(),
        "Means are sensitive to a small number of extreme first-day and one-year returns; \
         medians are reported alongside."
            .to_string(),
        "Group comparisons are descriptive and do not control for sector, size or listing year."
            .to_string(),
    ];
    if result.overview.spac.is_none()
        || result.overview.sp500.is_none()
        || result.overview.russell1000.is_none()
    {
        bullets.push("At least one reference list was missing from this run.".to_string());
    }
    s.blocks.push(Block::Bullets(bullets));
    s
}
