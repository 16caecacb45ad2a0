//! Seeded synthetic dataset for demos and end-to-end tests.
//!
//! Writes an IPO CSV in the real column layout, three reference lists as
//! CSV, and a `study.toml` pointing at them. The numbers are invented: SPACs
//! trade flat on day 0 and drift down over the year, index members
//! outperform, and a few IPOs have abnormal first days.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tracing::info;

use ipolens_core::ReturnWindow;

use crate::config::StudyConfig;

/// Fraction of generated IPOs that are SPACs.
const SPAC_SHARE: f64 = 0.25;
const SP500_SHARE: f64 = 0.04;
const RUSSELL_SHARE: f64 = 0.15;
const ABNORMAL_SHARE: f64 = 0.02;
/// Rows with no IPO date, which the loader drops.
const UNDATED_SHARE: f64 = 0.01;

/// Large caps that never IPO in the synthetic data but sit in the index lists.
const INCUMBENTS: [&str; 6] = ["AAPL", "MSFT", "AMZN", "JPM", "XOM", "KO"];

/// Files written by [`generate_dataset`].
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub dir: PathBuf,
    pub ipos: PathBuf,
    pub spacs: PathBuf,
    pub sp500: PathBuf,
    pub russell1000: PathBuf,
    pub config: PathBuf,
    pub rows: usize,
}

struct Row {
    symbol: String,
    date: Option<NaiveDate>,
    spac: bool,
    sp500: bool,
    russell: bool,
    ipo: [Option<f64>; 6],
    bench: [Option<f64>; 6],
}

/// Standard normal draw (Box-Muller).
fn normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn generate_row(rng: &mut StdRng, i: usize, start: NaiveDate, span_days: i64, last: NaiveDate) -> Row {
    let spac = rng.gen::<f64>() < SPAC_SHARE;
    let russell = !spac && rng.gen::<f64>() < RUSSELL_SHARE;
    let sp500 = russell && rng.gen::<f64>() < SP500_SHARE / RUSSELL_SHARE;
    let date = if rng.gen::<f64>() < UNDATED_SHARE {
        None
    } else {
        Some(start + Duration::days(rng.gen_range(0..span_days)))
    };

    let day0 = if spac {
        0.005 * normal(rng)
    } else if rng.gen::<f64>() < ABNORMAL_SHARE {
        rng.gen_range(1.0..3.0)
    } else {
        0.15 + 0.25 * normal(rng)
    };
    let drift = match (spac, sp500, russell) {
        (true, _, _) => -0.25,
        (_, true, _) => 0.35,
        (_, _, true) => 0.12,
        _ => -0.05,
    };
    let vol = if spac { 0.35 } else { 0.55 };
    let market = 0.08 + 0.15 * normal(rng);

    let mut ipo = [None; 6];
    let mut bench = [None; 6];
    for w in ReturnWindow::ALL {
        let days = w.trading_days();
        let matured = date.map_or(true, |d| d + Duration::days(i64::from(days) * 7 / 5) <= last);
        if !matured {
            continue;
        }
        let t = f64::from(days) / 252.0;
        let shock = vol * t.sqrt() * normal(rng);
        let r = (1.0 + day0) * (1.0 + drift * t + shock).max(0.02) - 1.0;
        ipo[w.index()] = Some(if days == 0 { day0 } else { r });
        bench[w.index()] = Some(if days == 0 { 0.002 * normal(rng) } else { market * t + 0.02 * normal(rng) });
    }

    Row {
        symbol: format!("SYN{i:04}"),
        date,
        spac,
        sp500,
        russell,
        ipo,
        bench,
    }
}

/// Write a synthetic study into `dir`. The same seed gives identical files.
pub fn generate_dataset(rows: usize, seed: u64, dir: &Path) -> Result<SyntheticDataset> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut rng = StdRng::seed_from_u64(seed);

    let start = NaiveDate::from_ymd_opt(2015, 1, 2).context("invalid start date")?;
    let last = NaiveDate::from_ymd_opt(2023, 10, 4).context("invalid end date")?;
    let span = (last - start).num_days();
    let data: Vec<Row> = (0..rows)
        .map(|i| generate_row(&mut rng, i, start, span, last))
        .collect();

    let ipos = dir.join("synthetic_ipos.csv");
    let mut wtr = csv::Writer::from_path(&ipos)
        .with_context(|| format!("Failed to create {}", ipos.display()))?;
    let mut header = vec!["symbol".to_string(), "ipo_date".to_string()];
    for w in ReturnWindow::ALL {
        header.push(w.ipo_column());
        header.push(w.benchmark_column());
    }
    wtr.write_record(&header)?;
    let cell = |v: Option<f64>| v.map(|x| format!("{x:.6}")).unwrap_or_default();
    for row in &data {
        let mut record = vec![
            row.symbol.clone(),
            row.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        ];
        for w in ReturnWindow::ALL {
            record.push(cell(row.ipo[w.index()]));
            record.push(cell(row.bench[w.index()]));
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;

    let spacs = write_list(dir, "synthetic_spacs.csv", data.iter().filter(|r| r.spac), &[])?;
    let sp500 = write_list(dir, "synthetic_sp500.csv", data.iter().filter(|r| r.sp500), &INCUMBENTS)?;
    let russell1000 = write_list(
        dir,
        "synthetic_russell1000.csv",
        data.iter().filter(|r| r.russell),
        &INCUMBENTS,
    )?;

    let mut config = StudyConfig::default();
    config.inputs.ipos = PathBuf::from("synthetic_ipos.csv");
    config.inputs.spacs = PathBuf::from("synthetic_spacs.csv");
    config.inputs.sp500 = PathBuf::from("synthetic_sp500.csv");
    config.inputs.russell1000 = PathBuf::from("synthetic_russell1000.csv");
    config.output.dir = PathBuf::from("output");
    config.output.subtitle = format!("Synthetic data ({rows} IPOs, seed {seed})");
    let config_path = dir.join("study.toml");
    let toml = config.to_toml().context("Failed to serialize synthetic config")?;
    std::fs::write(&config_path, toml)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    info!(rows, seed, dir = %dir.display(), "synthetic dataset written");
    Ok(SyntheticDataset {
        dir: dir.to_path_buf(),
        ipos,
        spacs,
        sp500,
        russell1000,
        config: config_path,
        rows,
    })
}

fn write_list<'a>(
    dir: &Path,
    name: &str,
    rows: impl Iterator<Item = &'a Row>,
    extra: &[&str],
) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut wtr = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    wtr.write_record(["symbol"])?;
    for symbol in extra {
        wtr.write_record([*symbol])?;
    }
    for row in rows {
        wtr.write_record([row.symbol.as_str()])?;
    }
    wtr.flush()?;
    Ok(path)
}
