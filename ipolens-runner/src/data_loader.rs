//! Input loading: the IPO events CSV and the ticker reference lists.
//!
//! Policy:
//! 1. The IPO CSV must have the symbol and date columns; return columns are
//!    optional and a missing one reads as "no data" for every row.
//! 2. Rows without an IPO date are dropped and counted.
//! 3. A date or number that is present but unparseable is an error naming
//!    the row and column; nothing is silently coerced.
//! 4. Reference lists are read from `.xlsx`/`.xls`/`.xlsm`/`.ods` with
//!    calamine, or as CSV otherwise. Only their symbol column is used.

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use ipolens_core::{IpoRecord, ReferenceList, ReturnWindow};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read spreadsheet {path}: {reason}")]
    Spreadsheet { path: PathBuf, reason: String },

    #[error("{path} has no worksheet or header row")]
    Empty { path: PathBuf },

    #[error("column '{column}' not found in {path} (available: {available})")]
    MissingColumn {
        path: PathBuf,
        column: String,
        available: String,
    },

    #[error("{path} row {row}: invalid date '{value}' in column '{column}'")]
    InvalidDate {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("{path} row {row}: invalid number '{value}' in column '{column}'")]
    InvalidNumber {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },
}

/// Column names used when reading the IPO CSV.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub symbol_column: String,
    pub date_column: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            symbol_column: "symbol".to_string(),
            date_column: "ipo_date".to_string(),
        }
    }
}

/// Result of loading the IPO CSV.
#[derive(Debug, Clone)]
pub struct LoadedIpos {
    pub records: Vec<IpoRecord>,
    /// Data rows in the file.
    pub rows_read: usize,
    /// Rows dropped for a missing IPO date.
    pub rows_dropped: usize,
    /// Return columns that were absent from the header.
    pub missing_columns: Vec<String>,
    /// BLAKE3 over every kept record, for provenance in exported results.
    pub dataset_hash: String,
}

/// Load the IPO events CSV.
pub fn load_ipos(path: &Path, opts: &LoadOptions) -> Result<LoadedIpos, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(clean_header)
        .collect();

    let symbol_idx = require_column(path, &headers, &opts.symbol_column)?;
    let date_idx = require_column(path, &headers, &opts.date_column)?;

    let mut missing_columns = Vec::new();
    let mut locate = |name: String| {
        let idx = find_column(&headers, &name);
        if idx.is_none() {
            warn!(column = %name, file = %path.display(), "return column missing; treating as empty");
            missing_columns.push(name);
        }
        idx
    };
    let ipo_cols: Vec<Option<usize>> = ReturnWindow::ALL.iter().map(|w| locate(w.ipo_column())).collect();
    let bench_cols: Vec<Option<usize>> =
        ReturnWindow::ALL.iter().map(|w| locate(w.benchmark_column())).collect();

    let mut records = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_dropped = 0usize;

    for (i, result) in reader.records().enumerate() {
        let row = i + 2; // 1-based, after the header line
        let rec = result.map_err(csv_err)?;
        rows_read += 1;

        let raw_date = rec.get(date_idx).unwrap_or("");
        if is_missing(raw_date) {
            rows_dropped += 1;
            continue;
        }
        let ipo_date = parse_date(raw_date).ok_or_else(|| LoadError::InvalidDate {
            path: path.to_path_buf(),
            row,
            column: headers[date_idx].clone(),
            value: raw_date.to_string(),
        })?;

        let symbol = rec.get(symbol_idx).unwrap_or("").to_string();
        let mut record = IpoRecord::new(symbol, ipo_date);

        for (w, (ipo_col, bench_col)) in ReturnWindow::ALL.iter().zip(ipo_cols.iter().zip(&bench_cols)) {
            let ipo = read_number(path, &rec, &headers, *ipo_col, row)?;
            let bench = read_number(path, &rec, &headers, *bench_col, row)?;
            record.set_ipo_return(*w, ipo);
            record.set_benchmark_return(*w, bench);
        }
        records.push(record);
    }

    if rows_dropped > 0 {
        warn!(rows_dropped, "dropped rows without an IPO date");
    }
    info!(
        file = %path.display(),
        rows_read,
        rows_kept = records.len(),
        "loaded IPO records"
    );

    let dataset_hash = compute_dataset_hash(&records);
    Ok(LoadedIpos {
        records,
        rows_read,
        rows_dropped,
        missing_columns,
        dataset_hash,
    })
}

/// Load a ticker reference list from a spreadsheet or CSV.
pub fn load_reference_list(
    name: &str,
    path: &Path,
    symbol_column: &str,
) -> Result<ReferenceList, LoadError> {
    let table = read_table(path, None)?;
    let idx = require_column(path, &table.columns, symbol_column)?;
    let list = ReferenceList::from_symbols(
        name,
        table.rows.iter().filter_map(|row| row.get(idx)),
    );
    info!(list = name, file = %path.display(), symbols = list.len(), "loaded reference list");
    Ok(list)
}

/// Column names and leading rows of an input file.
#[derive(Debug, Clone)]
pub struct TablePreview {
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read the header and the first `max_rows` rows of any supported input.
pub fn inspect_table(path: &Path, max_rows: usize) -> Result<TablePreview, LoadError> {
    let table = read_table(path, Some(max_rows))?;
    Ok(TablePreview {
        path: path.to_path_buf(),
        columns: table.columns,
        rows: table.rows,
    })
}

// ─── Table reading ──────────────────────────────────────────────────

struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn is_spreadsheet(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods")
    )
}

fn read_table(path: &Path, max_rows: Option<usize>) -> Result<RawTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }
    if is_spreadsheet(path) {
        read_spreadsheet(path, max_rows)
    } else {
        read_csv_table(path, max_rows)
    }
}

fn read_csv_table(path: &Path, max_rows: Option<usize>) -> Result<RawTable, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let columns = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(clean_header)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        if max_rows.is_some_and(|m| rows.len() >= m) {
            break;
        }
        let rec = result.map_err(csv_err)?;
        rows.push(rec.iter().map(str::to_string).collect());
    }
    Ok(RawTable { columns, rows })
}

fn read_spreadsheet(path: &Path, max_rows: Option<usize>) -> Result<RawTable, LoadError> {
    let sheet_err = |reason: String| LoadError::Spreadsheet {
        path: path.to_path_buf(),
        reason,
    };
    let mut workbook = open_workbook_auto(path).map_err(|e| sheet_err(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Empty {
            path: path.to_path_buf(),
        })?
        .map_err(|e| sheet_err(e.to_string()))?;

    let mut iter = range.rows();
    let columns: Vec<String> = iter
        .next()
        .ok_or_else(|| LoadError::Empty {
            path: path.to_path_buf(),
        })?
        .iter()
        .map(|c| clean_header(&cell_to_string(c)))
        .collect();

    let limit = max_rows.unwrap_or(usize::MAX);
    let rows = iter
        .take(limit)
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    debug!(file = %path.display(), columns = columns.len(), "read spreadsheet");
    Ok(RawTable { columns, rows })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        // Integral floats (numeric tickers, CIK codes) print without ".0".
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

// ─── Cell parsing ───────────────────────────────────────────────────

fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// Exact header match first, then a case-insensitive one.
fn find_column(headers: &[String], name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .or_else(|| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
}

fn require_column(path: &Path, headers: &[String], name: &str) -> Result<usize, LoadError> {
    find_column(headers, name).ok_or_else(|| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
        available: headers.join(", "),
    })
}

fn is_missing(raw: &str) -> bool {
    matches!(
        raw.trim(),
        "" | "NA" | "N/A" | "NaN" | "nan" | "NaT" | "null" | "NULL" | "None"
    )
}

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse the date formats seen in IPO exports.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|dt| dt.date())
        })
}

fn read_number(
    path: &Path,
    rec: &csv::StringRecord,
    headers: &[String],
    idx: Option<usize>,
    row: usize,
) -> Result<Option<f64>, LoadError> {
    let Some(idx) = idx else {
        return Ok(None);
    };
    let raw = rec.get(idx).unwrap_or("");
    if is_missing(raw) {
        return Ok(None);
    }
    raw.trim()
        .parse::<f64>()
        .map(|v| v.is_finite().then_some(v))
        .map_err(|_| LoadError::InvalidNumber {
            path: path.to_path_buf(),
            row,
            column: headers[idx].clone(),
            value: raw.to_string(),
        })
}

/// Deterministic BLAKE3 hash over the kept records, in file order.
fn compute_dataset_hash(records: &[IpoRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for r in records {
        hasher.update(r.symbol.as_bytes());
        hasher.update(&[0]);
        hasher.update(r.ipo_date.to_string().as_bytes());
        for w in ReturnWindow::ALL {
            hash_value(&mut hasher, r.ipo_return(w));
            hash_value(&mut hasher, r.benchmark_return(w));
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn hash_value(hasher: &mut blake3::Hasher, value: Option<f64>) {
    match value {
        Some(x) => {
            hasher.update(&[1]);
            hasher.update(&x.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "symbol,ipo_date,sym_day0_OTC,iwv_day0_OTC,sym_1day_ret,iwv_1day_ret,\
sym_5day_ret,iwv_5day_ret,sym_22day_ret,iwv_22day_ret,sym_91day_ret,iwv_91day_ret,\
sym_252day_ret,iwv_252day_ret";

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn spreadsheet_cells_as_text() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("  SPC ".into())), "SPC");
        assert_eq!(cell_to_string(&Data::Float(700.0)), "700");
        assert_eq!(cell_to_string(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
    }

    #[test]
    fn loads_rows_and_drops_missing_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "ipos.csv",
            &format!(
                "{HEADER}\n\
AAA,2020-01-15,0.10,0.01,0.02,0.0,0.05,0.01,0.08,0.02,0.12,0.03,0.30,0.10\n\
BBB,,0.50,0.01,,,,,,,,,,\n\
CCC,2021-06-01,NaN,,,,,,,,,,-0.40,0.15\n"
            ),
        );
        let loaded = load_ipos(&path, &LoadOptions::default()).unwrap();

        assert_eq!(loaded.rows_read, 3);
        assert_eq!(loaded.rows_dropped, 1);
        assert_eq!(loaded.records.len(), 2);
        assert!(loaded.missing_columns.is_empty());

        let aaa = &loaded.records[0];
        assert_eq!(aaa.symbol, "AAA");
        assert_eq!(aaa.ipo_date, NaiveDate::from_ymd_opt(2020, 1, 15).unwrap());
        assert_eq!(aaa.ipo_return(ReturnWindow::Day0), Some(0.10));
        assert_eq!(aaa.benchmark_return(ReturnWindow::Day252), Some(0.10));

        let ccc = &loaded.records[1];
        assert_eq!(ccc.ipo_return(ReturnWindow::Day0), None);
        assert_eq!(ccc.ipo_return(ReturnWindow::Day252), Some(-0.40));
    }

    #[test]
    fn missing_return_columns_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "ipos.csv", "symbol,ipo_date,sym_day0_OTC\nAAA,2020-01-15,0.1\n");
        let loaded = load_ipos(&path, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.records[0].ipo_return(ReturnWindow::Day0), Some(0.1));
        assert_eq!(loaded.records[0].ipo_return(ReturnWindow::Day22), None);
        assert_eq!(loaded.missing_columns.len(), 11);
    }

    #[test]
    fn missing_symbol_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "ipos.csv", "ticker,ipo_date\nAAA,2020-01-15\n");
        let err = load_ipos(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { .. }));
        assert!(err.to_string().contains("ticker"));
    }

    #[test]
    fn bad_date_names_row_and_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "ipos.csv", "symbol,ipo_date\nAAA,2020-01-15\nBBB,soon\n");
        let err = load_ipos(&path, &LoadOptions::default()).unwrap_err();
        match err {
            LoadError::InvalidDate { row, value, .. } => {
                assert_eq!(row, 3);
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_number_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "ipos.csv", "symbol,ipo_date,sym_5day_ret\nAAA,2020-01-15,abc\n");
        let err = load_ipos(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidNumber { .. }));
    }

    #[test]
    fn date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 10, 4).unwrap();
        for raw in ["2023-10-04", "2023/10/04", "10/04/2023", "20231004", "2023-10-04 00:00:00"] {
            assert_eq!(parse_date(raw), Some(expected), "{raw}");
        }
        assert_eq!(parse_date("04.10.2023"), None);
    }

    #[test]
    fn reference_list_from_csv_with_case_insensitive_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "sp500.csv", "Symbol,Name\nAAPL,Apple\nMSFT,Microsoft\n,\n");
        let list = load_reference_list("sp500", &path, "symbol").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains("AAPL"));
    }

    #[test]
    fn reference_list_missing_file() {
        let err = load_reference_list("spacs", Path::new("/nonexistent/spacs.xlsx"), "symbol").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn inspect_limits_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "t.csv", "a,b\n1,2\n3,4\n5,6\n");
        let preview = inspect_table(&path, 2).unwrap();
        assert_eq!(preview.columns, vec!["a", "b"]);
        assert_eq!(preview.rows.len(), 2);
    }

    #[test]
    fn dataset_hash_is_deterministic_and_content_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "symbol,ipo_date,sym_day0_OTC\nAAA,2020-01-15,0.1\n");
        let b = write(dir.path(), "b.csv", "symbol,ipo_date,sym_day0_OTC\nAAA,2020-01-15,0.2\n");
        let opts = LoadOptions::default();
        let h1 = load_ipos(&a, &opts).unwrap().dataset_hash;
        let h2 = load_ipos(&a, &opts).unwrap().dataset_hash;
        let h3 = load_ipos(&b, &opts).unwrap().dataset_hash;
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }
}
