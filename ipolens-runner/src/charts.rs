//! Charts of the study results, drawn with plotters.
//!
//! Every chart is planned once and drawn twice under the given directory:
//! `<name>.svg` for the markdown report and slide deck, `<name>.png` for
//! embedding in the Word and PDF documents. A chart whose data is
//! unavailable (for example the SPAC charts without a SPAC list) is skipped.

use anyhow::{bail, Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontStyle};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

use ipolens_core::stats::{complete_pairs, BoxStats, OlsFit};
use ipolens_core::{eleven_month_return, AnnotatedIpo, Flag, ReturnWindow};

use crate::config::AnalysisConfig;
use crate::reporting::tables::{inclusion_label, spac_label};
use crate::study::{FlagSummary, Study};

type Area<DB> = DrawingArea<DB, Shift>;

const STEEL: RGBColor = RGBColor(0x2E, 0x86, 0xAB);
const MAGENTA: RGBColor = RGBColor(0xA2, 0x3B, 0x72);
const ORANGE: RGBColor = RGBColor(0xF1, 0x8F, 0x01);
const BRICK: RGBColor = RGBColor(0xC7, 0x3E, 0x1D);
const JADE: RGBColor = RGBColor(0x06, 0xA7, 0x7D);
const TEAL: RGBColor = RGBColor(0x00, 0x5F, 0x73);

const SINGLE: (u32, u32) = (1000, 600);
const DOUBLE: (u32, u32) = (1400, 500);
const HALF_WIDTH: i32 = 700;

/// Text face for every chart. Raster output has no system font lookup.
const CHART_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

fn register_chart_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED
        .get_or_init(|| register_font("sans-serif", FontStyle::Normal, CHART_FONT).is_ok());
    if !ok {
        bail!("bundled chart font could not be loaded");
    }
    Ok(())
}

/// A chart written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    /// File stem, e.g. `day0_comparison`.
    pub name: &'static str,
    pub title: String,
    /// Vector rendering.
    pub path: PathBuf,
    /// Raster rendering of the same chart.
    pub png: PathBuf,
    /// Pixel size of both renderings.
    pub width: u32,
    pub height: u32,
}

/// One plot. A chart holds one panel, or two side by side.
enum Panel {
    Bars {
        title: String,
        y_desc: &'static str,
        axis: Axis,
        categories: Vec<String>,
        series: Vec<BarSeries>,
        value_labels: bool,
    },
    Boxes {
        title: String,
        y_desc: &'static str,
        categories: Vec<String>,
        boxes: Vec<Option<BoxStats>>,
        colors: Vec<RGBColor>,
    },
    Scatter {
        title: String,
        x_desc: &'static str,
        y_desc: &'static str,
        points: Vec<(f64, f64)>,
        fit: Option<OlsFit>,
    },
}

struct ChartPlan {
    name: &'static str,
    title: String,
    size: (u32, u32),
    panels: Vec<Panel>,
}

/// Render every chart the study has data for into `dir`.
pub fn render_charts(study: &Study, config: &AnalysisConfig, dir: &Path) -> Result<Vec<ChartArtifact>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create chart directory {}", dir.display()))?;
    register_chart_font()?;

    let mut charts = Vec::new();
    for plan in plan_charts(study, config) {
        let path = dir.join(format!("{}.svg", plan.name));
        {
            let root = SVGBackend::new(&path, plan.size).into_drawing_area();
            draw_plan(&root, &plan)?;
            root.present()
                .with_context(|| format!("failed to write chart {}", path.display()))?;
        }
        let png = dir.join(format!("{}.png", plan.name));
        {
            let root = BitMapBackend::new(&png, plan.size).into_drawing_area();
            draw_plan(&root, &plan)?;
            root.present()
                .with_context(|| format!("failed to write chart {}", png.display()))?;
        }
        debug!(chart = plan.name, path = %path.display(), "chart written");
        charts.push(ChartArtifact {
            name: plan.name,
            title: plan.title,
            path,
            png,
            width: plan.size.0,
            height: plan.size.1,
        });
    }

    info!(count = charts.len(), dir = %dir.display(), "charts rendered");
    Ok(charts)
}

fn draw_plan<DB>(root: &Area<DB>, plan: &ChartPlan) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    match plan.panels.as_slice() {
        [single] => draw_panel(root, single),
        [left, right] => {
            let (l, r) = root.split_horizontally(HALF_WIDTH);
            draw_panel(&l, left)?;
            draw_panel(&r, right)
        }
        _ => bail!("chart {} needs one or two panels", plan.name),
    }
}

fn draw_panel<DB>(area: &Area<DB>, panel: &Panel) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    match panel {
        Panel::Bars {
            title,
            y_desc,
            axis,
            categories,
            series,
            value_labels,
        } => draw_bars(area, title, y_desc, *axis, categories, series, *value_labels),
        Panel::Boxes {
            title,
            y_desc,
            categories,
            boxes,
            colors,
        } => draw_boxes(area, title, y_desc, categories, boxes, colors),
        Panel::Scatter {
            title,
            x_desc,
            y_desc,
            points,
            fit,
        } => draw_scatter(area, title, x_desc, y_desc, points, fit.as_ref()),
    }
}

fn plan_charts(study: &Study, config: &AnalysisConfig) -> Vec<ChartPlan> {
    let result = &study.result;
    let rows = &study.rows;
    let mut plans = Vec::new();
    let mut plan = |name: &'static str, title: &str, size: (u32, u32), panels: Vec<Panel>| {
        plans.push(ChartPlan {
            name,
            title: title.to_string(),
            size,
            panels,
        });
    };

    if let Some(years) = &result.spac_by_year {
        let title = "Number of IPOs by Year (SPAC vs Non-SPAC)";
        plan(
            "spac_counts_by_year",
            title,
            SINGLE,
            vec![Panel::Bars {
                title: title.to_string(),
                y_desc: "Count",
                axis: Axis::Count,
                categories: years.iter().map(|y| y.year.to_string()).collect(),
                series: vec![
                    BarSeries::labelled("Non-SPAC", STEEL, years.iter().map(|y| Some(y.non_spac as f64)).collect()),
                    BarSeries::labelled("SPAC", MAGENTA, years.iter().map(|y| Some(y.spac as f64)).collect()),
                ],
                value_labels: false,
            }],
        );
    }

    let full = complete_pairs(
        &column(rows, ReturnWindow::Day22),
        &column(rows, ReturnWindow::Day252),
    );
    if !full.is_empty() {
        let title = "One Year Return against First Month Return";
        plan(
            "scatter_22_252",
            title,
            SINGLE,
            vec![Panel::Scatter {
                title: title.to_string(),
                x_desc: "22-day return",
                y_desc: "252-day return",
                points: full,
                fit: result.predictive.full_fit,
            }],
        );
    }

    let cutoff = result.overview.regression_outlier_cutoff;
    let eleven: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| {
            let r22 = r.ipo_return(ReturnWindow::Day22).filter(|v| *v < cutoff)?;
            Some((r22, eleven_month_return(Some(r22), r.ipo_return(ReturnWindow::Day252))?))
        })
        .collect();
    if !eleven.is_empty() {
        let title = "11-Month Return against First Month Return";
        plan(
            "scatter_22_252_11month",
            title,
            SINGLE,
            vec![Panel::Scatter {
                title: title.to_string(),
                x_desc: "22-day return",
                y_desc: "11-month return",
                points: eleven,
                fit: None,
            }],
        );
    }

    if let Some(day0) = &result.day0 {
        let (categories, means) = flag_means(&day0.by_spac, spac_label);
        plan(
            "day0_comparison",
            "Day 0 Returns: SPAC vs Non-SPAC",
            DOUBLE,
            vec![
                Panel::Bars {
                    title: "Day 0 Mean Returns: SPAC vs Non-SPAC".to_string(),
                    y_desc: "Mean return",
                    axis: Axis::Percent,
                    categories: categories.clone(),
                    series: vec![BarSeries::per_bar(vec![STEEL, MAGENTA], means)],
                    value_labels: false,
                },
                Panel::Boxes {
                    title: format!(
                        "Day 0 Return Distribution (filtered < {:.0}%)",
                        config.day0_chart_cutoff * 100.0
                    ),
                    y_desc: "Day 0 return",
                    categories,
                    boxes: flag_boxes(rows, |r| r.membership.spac, ReturnWindow::Day0, config.day0_chart_cutoff),
                    colors: vec![STEEL, MAGENTA],
                },
            ],
        );
    }

    if let Some(windows) = &result.windows_by_spac {
        let categories: Vec<String> = windows.iter().map(|w| w.window.label().to_string()).collect();
        let title = "Mean Returns Across Time Windows: SPAC vs Non-SPAC";
        plan(
            "multiwindow_comparison",
            title,
            SINGLE,
            vec![Panel::Bars {
                title: title.to_string(),
                y_desc: "Mean return",
                axis: Axis::Percent,
                categories: categories.clone(),
                series: vec![
                    BarSeries::labelled("Non-SPAC", STEEL, windows.iter().map(|w| w.non_spac.mean).collect()),
                    BarSeries::labelled("SPAC", MAGENTA, windows.iter().map(|w| w.spac.mean).collect()),
                ],
                value_labels: false,
            }],
        );

        let title = "Return Volatility Across Time Windows: SPAC vs Non-SPAC";
        plan(
            "volatility_comparison",
            title,
            SINGLE,
            vec![Panel::Bars {
                title: title.to_string(),
                y_desc: "Standard deviation",
                axis: Axis::Percent,
                categories,
                series: vec![
                    BarSeries::labelled("Non-SPAC", STEEL, windows.iter().map(|w| w.non_spac.std).collect()),
                    BarSeries::labelled("SPAC", MAGENTA, windows.iter().map(|w| w.spac.std).collect()),
                ],
                value_labels: false,
            }],
        );
    }

    let inclusion_charts: [(&'static str, &str, Option<&Vec<FlagSummary>>, fn(&AnnotatedIpo) -> Option<Flag>, [RGBColor; 2], RGBColor); 2] = [
        (
            "sp500_performance",
            "S&P 500 Inclusion: 1-Year Return Performance",
            result.inclusion.sp500.as_ref(),
            |r| r.membership.sp500,
            [ORANGE, BRICK],
            ORANGE,
        ),
        (
            "russell1000_performance",
            "Russell 1000 Inclusion: 1-Year Return Performance",
            result.inclusion.russell1000.as_ref(),
            |r| r.membership.russell1000,
            [JADE, TEAL],
            JADE,
        ),
    ];
    for (name, title, groups, flag, bar_colors, box_color) in inclusion_charts {
        let Some(groups) = groups else { continue };
        let (categories, means) = flag_means(groups, inclusion_label);
        let medians = FLAG_ORDER
            .iter()
            .map(|&f| groups.iter().find(|g| g.flag == f).and_then(|g| g.summary.median))
            .collect();
        plan(
            name,
            title,
            DOUBLE,
            vec![
                Panel::Bars {
                    title: title.to_string(),
                    y_desc: "1-year return",
                    axis: Axis::Percent,
                    categories: categories.clone(),
                    series: vec![
                        BarSeries::labelled("Mean", bar_colors[0], means),
                        BarSeries::labelled("Median", bar_colors[1], medians),
                    ],
                    value_labels: false,
                },
                Panel::Boxes {
                    title: format!(
                        "1-Year Return Distribution (filtered < {:.0}%)",
                        config.one_year_chart_cutoff * 100.0
                    ),
                    y_desc: "1-year return",
                    categories,
                    boxes: flag_boxes(rows, flag, ReturnWindow::Day252, config.one_year_chart_cutoff),
                    colors: vec![STEEL, box_color],
                },
            ],
        );
    }

    if let Some(cmp) = &result.index_comparison {
        let title = "Index Inclusion Impact on 1-Year Returns";
        plan(
            "index_comparison",
            title,
            SINGLE,
            vec![Panel::Bars {
                title: title.to_string(),
                y_desc: "Mean 1-year return",
                axis: Axis::Percent,
                categories: vec![
                    "Not included".to_string(),
                    "S&P 500".to_string(),
                    "Russell 1000".to_string(),
                ],
                series: vec![BarSeries::per_bar(
                    vec![STEEL, ORANGE, JADE],
                    vec![cmp.neither.mean, cmp.sp500.mean, cmp.russell1000.mean],
                )],
                value_labels: true,
            }],
        );
    }

    plans
}

// ─── Data helpers ───────────────────────────────────────────────────

/// Category order on every yes/no chart: excluded group first.
const FLAG_ORDER: [Flag; 2] = [Flag::No, Flag::Yes];

fn column(rows: &[AnnotatedIpo], window: ReturnWindow) -> Vec<Option<f64>> {
    rows.iter().map(|r| r.ipo_return(window)).collect()
}

/// Box statistics for the No and Yes groups, keeping values below `cutoff`.
fn flag_boxes<F>(rows: &[AnnotatedIpo], flag: F, window: ReturnWindow, cutoff: f64) -> Vec<Option<BoxStats>>
where
    F: Fn(&AnnotatedIpo) -> Option<Flag>,
{
    FLAG_ORDER
        .iter()
        .map(|&f| {
            BoxStats::from_values(
                rows.iter()
                    .filter(|r| flag(r) == Some(f))
                    .map(|r| r.ipo_return(window).filter(|v| *v < cutoff)),
            )
        })
        .collect()
}

fn flag_means(groups: &[FlagSummary], label: fn(Flag) -> &'static str) -> (Vec<String>, Vec<Option<f64>>) {
    FLAG_ORDER
        .iter()
        .map(|&f| {
            let mean = groups.iter().find(|g| g.flag == f).and_then(|g| g.summary.mean);
            (label(f).to_string(), mean)
        })
        .unzip()
}

// ─── Drawing primitives ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Axis {
    Percent,
    Count,
}

impl Axis {
    fn format(self, v: f64) -> String {
        match self {
            Axis::Percent => format!("{:.0}%", v * 100.0),
            Axis::Count => format!("{v:.0}"),
        }
    }

    fn value_label(self, v: f64) -> String {
        match self {
            Axis::Percent => format!("{:.2}%", v * 100.0),
            Axis::Count => format!("{v:.0}"),
        }
    }
}

/// One bar per category; `colors` holds either one colour or one per bar.
struct BarSeries {
    label: Option<&'static str>,
    colors: Vec<RGBColor>,
    values: Vec<Option<f64>>,
}

impl BarSeries {
    fn labelled(label: &'static str, color: RGBColor, values: Vec<Option<f64>>) -> Self {
        Self {
            label: Some(label),
            colors: vec![color],
            values,
        }
    }

    fn per_bar(colors: Vec<RGBColor>, values: Vec<Option<f64>>) -> Self {
        Self {
            label: None,
            colors,
            values,
        }
    }

    fn color(&self, i: usize) -> RGBColor {
        self.colors
            .get(i)
            .or_else(|| self.colors.first())
            .copied()
            .unwrap_or(STEEL)
    }
}

/// Axis range covering `values` with 10% headroom.
fn padded_range(values: impl Iterator<Item = f64>, include_zero: bool) -> (f64, f64) {
    let (mut lo, mut hi) = if include_zero {
        (0.0, 0.0)
    } else {
        (f64::INFINITY, f64::NEG_INFINITY)
    };
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.1 } else { (hi.abs() * 0.1).max(1.0) };
    (lo - pad, hi + pad)
}

fn category_label(categories: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    categories.get(i as usize).cloned().unwrap_or_default()
}

fn draw_bars<DB>(
    area: &Area<DB>,
    title: &str,
    y_desc: &str,
    axis: Axis,
    categories: &[String],
    series: &[BarSeries],
    value_labels: bool,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = categories.len();
    let (lo, hi) = padded_range(series.iter().flat_map(|s| s.values.iter().flatten().copied()), true);
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), lo..hi)?;

    let x_fmt = |x: &f64| category_label(categories, *x);
    let y_fmt = |y: &f64| axis.format(*y);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n + 1)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .y_desc(y_desc)
        .draw()?;

    let width = 0.8 / series.len().max(1) as f64;
    for (j, s) in series.iter().enumerate() {
        let offset = -0.4 + j as f64 * width;
        let bars = s.values.iter().enumerate().filter_map(|(i, v)| {
            let x0 = i as f64 + offset;
            v.map(|v| Rectangle::new([(x0, 0.0), (x0 + width, v)], s.color(i).filled()))
        });
        let drawn = chart.draw_series(bars)?;
        if let Some(label) = s.label {
            let color = s.color(0);
            drawn
                .label(label)
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        if value_labels {
            let style = TextStyle::from(("sans-serif", 15).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
            chart.draw_series(s.values.iter().enumerate().filter_map(|(i, v)| {
                v.map(|v| Text::new(axis.value_label(v), (i as f64 + offset + width / 2.0, v), style.clone()))
            }))?;
        }
    }

    chart.draw_series(LineSeries::new(
        vec![(-0.5, 0.0), (n as f64 - 0.5, 0.0)],
        BLACK.stroke_width(1),
    ))?;

    if series.iter().any(|s| s.label.is_some()) {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

/// Box plots (quartile box, median line, Tukey whiskers); outliers omitted.
fn draw_boxes<DB>(
    area: &Area<DB>,
    title: &str,
    y_desc: &str,
    categories: &[String],
    boxes: &[Option<BoxStats>],
    colors: &[RGBColor],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = categories.len();
    let (lo, hi) = padded_range(
        boxes.iter().flatten().flat_map(|b| [b.lower_whisker, b.upper_whisker]),
        true,
    );
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), lo..hi)?;

    let x_fmt = |x: &f64| category_label(categories, *x);
    let y_fmt = |y: &f64| Axis::Percent.format(*y);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n + 1)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .y_desc(y_desc)
        .draw()?;

    for (i, b) in boxes.iter().enumerate() {
        let Some(b) = b else { continue };
        let x = i as f64;
        let color = colors.get(i).copied().unwrap_or(STEEL);
        let body = [(x - 0.3, b.q1), (x + 0.3, b.q3)];
        chart.draw_series([
            Rectangle::new(body, color.mix(0.7).filled()),
            Rectangle::new(body, BLACK.stroke_width(1)),
        ])?;
        let lines = [
            vec![(x - 0.3, b.median), (x + 0.3, b.median)],
            vec![(x, b.q3), (x, b.upper_whisker)],
            vec![(x, b.q1), (x, b.lower_whisker)],
            vec![(x - 0.15, b.upper_whisker), (x + 0.15, b.upper_whisker)],
            vec![(x - 0.15, b.lower_whisker), (x + 0.15, b.lower_whisker)],
        ];
        chart.draw_series(
            lines
                .into_iter()
                .map(|pts| PathElement::new(pts, BLACK.stroke_width(2))),
        )?;
    }

    chart.draw_series(LineSeries::new(
        vec![(-0.5, 0.0), (n as f64 - 0.5, 0.0)],
        BLACK.stroke_width(1),
    ))?;
    Ok(())
}

fn draw_scatter<DB>(
    area: &Area<DB>,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    points: &[(f64, f64)],
    fit: Option<&OlsFit>,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_lo, x_hi) = padded_range(points.iter().map(|p| p.0), false);
    let (y_lo, y_hi) = padded_range(points.iter().map(|p| p.1), false);
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    let fmt = |v: &f64| Axis::Percent.format(*v);
    chart
        .configure_mesh()
        .x_label_formatter(&fmt)
        .y_label_formatter(&fmt)
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&p| Circle::new(p, 2, STEEL.mix(0.5).filled())),
    )?;

    if let Some(fit) = fit {
        chart
            .draw_series(LineSeries::new(
                vec![(x_lo, fit.predict(x_lo)), (x_hi, fit.predict(x_hi))],
                BRICK.stroke_width(2),
            ))?
            .label(format!(
                "OLS: y = {:.3} + {:.3}x (R² = {:.3})",
                fit.intercept.estimate, fit.slope.estimate, fit.r_squared
            ))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BRICK.stroke_width(2)));
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}
