//! Machine-readable exports: the study result as JSON and the annotated
//! rows as CSV.
//!
//! The JSON carries a `schema_version`; newer versions are rejected on load.

use anyhow::{bail, Context, Result};

use ipolens_core::{AnnotatedIpo, ReturnWindow};

use crate::study::{StudyResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `StudyResult` to pretty JSON.
pub fn export_study_json(result: &StudyResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize StudyResult to JSON")
}

/// Deserialize a `StudyResult`, rejecting schema versions newer than this build.
pub fn import_study_json(json: &str) -> Result<StudyResult> {
    let result: StudyResult =
        serde_json::from_str(json).context("failed to deserialize StudyResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the annotated rows.
///
/// Columns: symbol, ipo_date, year, month, every `sym_*`/`iwv_*` return
/// column, spac, sp, russell, day0_lvl. Missing values are empty cells.
///
/// `day0_lvl` is empty when the day-0 return is missing. A NaN comparison
/// in a dataframe would label such rows "abnormal"; here they stay
/// unclassified.
pub fn export_processed_csv(rows: &[AnnotatedIpo]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec![
        "symbol".to_string(),
        "ipo_date".to_string(),
        "year".to_string(),
        "month".to_string(),
    ];
    for w in ReturnWindow::ALL {
        header.push(w.ipo_column());
        header.push(w.benchmark_column());
    }
    header.extend(["spac", "sp", "russell", "day0_lvl"].map(String::from));
    wtr.write_record(&header)?;

    let cell = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for row in rows {
        let r = &row.record;
        let m = &row.membership;
        let mut record = vec![
            r.symbol.clone(),
            r.ipo_date.to_string(),
            r.year().to_string(),
            r.month().to_string(),
        ];
        for w in ReturnWindow::ALL {
            record.push(cell(r.ipo_return(w)));
            record.push(cell(r.benchmark_return(w)));
        }
        for flag in [m.spac, m.sp500, m.russell1000] {
            record.push(flag.map(|f| f.as_str().to_string()).unwrap_or_default());
        }
        record.push(m.day0_level.map(|l| l.as_str().to_string()).unwrap_or_default());
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::{compute, Overview};
    use chrono::NaiveDate;
    use ipolens_core::{Day0Level, Flag, IpoRecord, Membership};
    use std::path::PathBuf;

    fn rows() -> Vec<AnnotatedIpo> {
        let date = NaiveDate::from_ymd_opt(2021, 7, 14).unwrap();
        vec![
            AnnotatedIpo {
                record: IpoRecord::new("AAA", date)
                    .with_return(ReturnWindow::Day0, 0.25)
                    .with_return(ReturnWindow::Day22, 0.1)
                    .with_return(ReturnWindow::Day252, -0.3)
                    .with_benchmark(ReturnWindow::Day0, 0.01),
                membership: Membership {
                    spac: Some(Flag::No),
                    sp500: Some(Flag::Yes),
                    russell1000: None,
                    day0_level: Some(Day0Level::Normal),
                },
            },
            AnnotatedIpo {
                record: IpoRecord::new("BBB", date)
                    .with_return(ReturnWindow::Day22, 0.3)
                    .with_return(ReturnWindow::Day252, 0.2),
                membership: Membership::default(),
            },
            AnnotatedIpo {
                record: IpoRecord::new("CCC", date)
                    .with_return(ReturnWindow::Day22, -0.1)
                    .with_return(ReturnWindow::Day252, 0.4),
                membership: Membership::default(),
            },
        ]
    }

    fn result() -> StudyResult {
        let rows = rows();
        let overview = Overview {
            source: PathBuf::from("ipos.csv"),
            rows_read: 3,
            rows_dropped: 0,
            rows_kept: 3,
            first_ipo: Some(rows[0].record.ipo_date),
            last_ipo: Some(rows[0].record.ipo_date),
            dataset_hash: "abc".into(),
            spac: None,
            sp500: None,
            russell1000: None,
            day0_abnormal_threshold: 1.0,
            regression_outlier_cutoff: 5.0,
        };
        compute(&rows, overview, 5.0)
    }

    #[test]
    fn json_roundtrip() {
        let original = result();
        let json = export_study_json(&original).unwrap();
        assert!(json.contains("\"schema_version\": 1"));
        let restored = import_study_json(&json).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn rejects_future_schema_version() {
        let mut future = result();
        future.schema_version = SCHEMA_VERSION + 1;
        let json = export_study_json(&future).unwrap();
        let err = import_study_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn processed_csv_layout() {
        let csv = export_processed_csv(&rows()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);

        let header: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(header.len(), 4 + 12 + 4);
        assert_eq!(header[4], "sym_day0_OTC");
        assert_eq!(header[5], "iwv_day0_OTC");
        assert_eq!(header[header.len() - 1], "day0_lvl");

        let first: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(first[0], "AAA");
        assert_eq!(first[1], "2021-07-14");
        assert_eq!(first[2], "2021");
        assert_eq!(first[3], "7");
        assert_eq!(first[4], "0.25");
        assert_eq!(&first[16..], &["no", "yes", "", "normal"]);
    }

    #[test]
    fn missing_day0_return_leaves_level_empty() {
        let date = NaiveDate::from_ymd_opt(2021, 7, 14).unwrap();
        let records = vec![
            IpoRecord::new("NAN", date).with_return(ReturnWindow::Day22, 0.1),
            IpoRecord::new("HOT", date).with_return(ReturnWindow::Day0, 1.2),
        ];
        let rows = ipolens_core::ReferenceSet::default().annotate(records);
        let csv = export_processed_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[1].starts_with("NAN,"));
        assert!(lines[1].ends_with(','), "{}", lines[1]);
        assert!(lines[2].ends_with(",abnormal"), "{}", lines[2]);
    }
}
