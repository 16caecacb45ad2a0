//! ipolens runner: study orchestration, exports, charts and documents.
//!
//! This crate builds on `ipolens-core` to provide:
//! - TOML study configuration
//! - Loading of the IPO CSV and the ticker reference lists (CSV/XLSX)
//! - The study pipeline producing a serializable `StudyResult`
//! - JSON and processed-CSV exports
//! - SVG charts, and markdown / slide-deck / DOCX / PDF reports
//! - Artifact verification and synthetic demo datasets

pub mod charts;
pub mod config;
pub mod console;
pub mod data_loader;
pub mod export;
pub mod reporting;
pub mod study;
pub mod synthetic;
pub mod verify;

pub use charts::{render_charts, ChartArtifact};
pub use config::{AnalysisConfig, ConfigError, InputConfig, OutputConfig, StudyConfig};
pub use console::print_study;
pub use data_loader::{inspect_table, load_ipos, load_reference_list, LoadError, LoadOptions, LoadedIpos};
pub use export::{export_processed_csv, export_study_json, import_study_json};
pub use reporting::{ArtifactManager, ArtifactPaths, ReportFormat};
pub use study::{run_study, Study, StudyError, StudyResult, SCHEMA_VERSION};
pub use synthetic::{generate_dataset, SyntheticDataset};
pub use verify::{verify_artifacts, VerifyReport};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use ipolens_core::{classify_day0, AnnotatedIpo, Flag, IpoRecord, Membership, ReturnWindow};
    use std::path::PathBuf;

    use crate::study::{compute, FlagCount, Overview, Study};

    /// Forty annotated IPOs over 2019-2022 with every flag populated.
    pub fn fixture_study() -> Study {
        let rows: Vec<AnnotatedIpo> = (0..40)
            .map(|i: i32| {
                let spac = i % 4 == 0;
                let f = i as f64;
                let day0 = if i % 13 == 5 { 1.4 + f / 100.0 } else { (f % 7.0 - 3.0) / 20.0 };
                let r22 = (f % 9.0 - 4.0) / 25.0;
                let r252 = r22 * 1.5 + (f % 5.0 - 2.0) / 10.0 - if spac { 0.2 } else { 0.0 };
                let mut record = IpoRecord::new(
                    format!("T{i:02}"),
                    NaiveDate::from_ymd_opt(2019 + i % 4, 1 + (i % 12) as u32, 15).unwrap_or_default(),
                );
                for w in ReturnWindow::ALL {
                    let scale = w.trading_days() as f64 / 252.0;
                    record.set_ipo_return(w, Some(day0 + r252 * scale));
                    record.set_benchmark_return(w, Some(0.08 * scale));
                }
                record.set_ipo_return(ReturnWindow::Day0, Some(day0));
                record.set_ipo_return(ReturnWindow::Day22, Some(r22));
                record.set_ipo_return(ReturnWindow::Day252, Some(r252));
                AnnotatedIpo {
                    membership: Membership {
                        spac: Some(Flag::from_bool(spac)),
                        sp500: Some(Flag::from_bool(i % 10 == 3)),
                        russell1000: Some(Flag::from_bool(i % 5 == 3)),
                        day0_level: classify_day0(Some(day0), 1.0),
                    },
                    record,
                }
            })
            .collect();

        let count = |pred: &dyn Fn(&Membership) -> bool| {
            let yes = rows.iter().filter(|r| pred(&r.membership)).count();
            Some(FlagCount { yes, no: rows.len() - yes })
        };
        let overview = Overview {
            source: PathBuf::from("fixture.csv"),
            rows_read: 41,
            rows_dropped: 1,
            rows_kept: rows.len(),
            first_ipo: rows.iter().map(|r| r.record.ipo_date).min(),
            last_ipo: rows.iter().map(|r| r.record.ipo_date).max(),
            dataset_hash: "f".repeat(64),
            spac: count(&|m| m.spac == Some(Flag::Yes)),
            sp500: count(&|m| m.sp500 == Some(Flag::Yes)),
            russell1000: count(&|m| m.russell1000 == Some(Flag::Yes)),
            day0_abnormal_threshold: 1.0,
            regression_outlier_cutoff: 5.0,
        };
        let result = compute(&rows, overview, 5.0);
        Study { rows, result }
    }
}
