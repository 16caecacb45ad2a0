//! Study configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) runs the
//! study against the conventional input names in the working directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use ipolens_core::DEFAULT_ABNORMAL_THRESHOLD;

use crate::reporting::ReportFormat;

/// Errors from reading or validating a study config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete configuration for one study run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StudyConfig {
    pub inputs: InputConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

/// Input file locations and column names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// IPO events CSV, one row per IPO.
    pub ipos: PathBuf,
    /// SPAC ticker list (XLSX or CSV).
    pub spacs: PathBuf,
    /// S&P 500 constituents (XLSX or CSV).
    pub sp500: PathBuf,
    /// Russell 1000 constituents (XLSX or CSV).
    pub russell1000: PathBuf,
    /// Ticker column, shared by the IPO CSV and the reference lists.
    pub symbol_column: String,
    pub date_column: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            ipos: PathBuf::from("stock_ipos_20231004.csv"),
            spacs: PathBuf::from("list_of_all_spacs.xlsx"),
            sp500: PathBuf::from("sp500_202308.xlsx"),
            russell1000: PathBuf::from("russ_1000_202308.xlsx"),
            symbol_column: "symbol".to_string(),
            date_column: "ipo_date".to_string(),
        }
    }
}

/// Thresholds used by the analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Day-0 returns at or above this are "abnormal".
    pub day0_abnormal_threshold: f64,
    /// The filtered regression keeps rows with a 22-day return below this.
    pub regression_outlier_cutoff: f64,
    /// Box plot of day-0 returns only shows values below this.
    pub day0_chart_cutoff: f64,
    /// Box plots of 1-year returns only show values below this.
    pub one_year_chart_cutoff: f64,
    /// Fail the run when a reference list cannot be loaded, instead of
    /// skipping the sections that depend on it.
    pub require_reference_lists: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            day0_abnormal_threshold: DEFAULT_ABNORMAL_THRESHOLD,
            regression_outlier_cutoff: 5.0,
            day0_chart_cutoff: 2.0,
            one_year_chart_cutoff: 3.0,
            require_reference_lists: false,
        }
    }
}

/// Where and what to write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub formats: Vec<ReportFormat>,
    pub charts: bool,
    pub processed_csv: bool,
    pub title: String,
    pub subtitle: String,
    pub author: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            formats: ReportFormat::ALL.to_vec(),
            charts: true,
            processed_csv: true,
            title: "IPO Analysis Report".to_string(),
            subtitle: "SPAC vs Non-SPAC Returns and Index Inclusion Performance".to_string(),
            author: None,
        }
    }
}

impl StudyConfig {
    /// Load a config file. Relative input and output paths are resolved
    /// against the directory containing the file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML (used by `synth` to write a matching config).
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.analysis;
        let finite = [
            ("analysis.day0_abnormal_threshold", a.day0_abnormal_threshold),
            ("analysis.regression_outlier_cutoff", a.regression_outlier_cutoff),
            ("analysis.day0_chart_cutoff", a.day0_chart_cutoff),
            ("analysis.one_year_chart_cutoff", a.one_year_chart_cutoff),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a finite number, got {value}"),
                });
            }
        }
        if self.inputs.symbol_column.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "inputs.symbol_column",
                reason: "must not be empty".into(),
            });
        }
        if self.inputs.date_column.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "inputs.date_column",
                reason: "must not be empty".into(),
            });
        }
        if self.output.formats.is_empty() {
            return Err(ConfigError::Invalid {
                field: "output.formats",
                reason: "at least one report format is required".into(),
            });
        }
        Ok(())
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.inputs.ipos);
        resolve(&mut self.inputs.spacs);
        resolve(&mut self.inputs.sp500);
        resolve(&mut self.inputs.russell1000);
        resolve(&mut self.output.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = StudyConfig::from_toml("").unwrap();
        assert_eq!(config, StudyConfig::default());
        assert_eq!(config.analysis.day0_abnormal_threshold, 1.0);
        assert_eq!(config.analysis.regression_outlier_cutoff, 5.0);
        assert_eq!(config.inputs.symbol_column, "symbol");
        assert_eq!(config.output.formats.len(), 4);
    }

    #[test]
    fn partial_sections_override_defaults() {
        let config = StudyConfig::from_toml(
            r#"
[inputs]
ipos = "data/ipos.csv"

[analysis]
day0_abnormal_threshold = 0.5
require_reference_lists = true

[output]
formats = ["markdown", "pdf"]
charts = false
"#,
        )
        .unwrap();
        assert_eq!(config.inputs.ipos, PathBuf::from("data/ipos.csv"));
        assert_eq!(config.inputs.date_column, "ipo_date");
        assert_eq!(config.analysis.day0_abnormal_threshold, 0.5);
        assert!(config.analysis.require_reference_lists);
        assert_eq!(config.output.formats, vec![ReportFormat::Markdown, ReportFormat::Pdf]);
        assert!(!config.output.charts);
        assert!(config.output.processed_csv);
    }

    #[test]
    fn rejects_empty_formats() {
        let err = StudyConfig::from_toml("[output]\nformats = []\n").unwrap_err();
        assert!(err.to_string().contains("output.formats"));
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(StudyConfig::from_toml("[output]\nformats = [\"pptx\"]\n").is_err());
    }

    #[test]
    fn rejects_non_finite_threshold() {
        let err = StudyConfig::from_toml("[analysis]\nday0_chart_cutoff = nan\n").unwrap_err();
        assert!(err.to_string().contains("day0_chart_cutoff"));
    }

    #[test]
    fn from_file_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.toml");
        std::fs::write(&path, "[inputs]\nipos = \"ipos.csv\"\n").unwrap();

        let config = StudyConfig::from_file(&path).unwrap();
        assert_eq!(config.inputs.ipos, dir.path().join("ipos.csv"));
        assert_eq!(config.output.dir, dir.path().join("output"));
    }

    #[test]
    fn toml_roundtrip() {
        let config = StudyConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(StudyConfig::from_toml(&text).unwrap(), config);
    }
}
