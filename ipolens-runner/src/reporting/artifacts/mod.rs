//! Artifact manager for persisting study outputs.
//!
//! Layout of an output directory:
//!
//! ```text
//! out/
//!   manifest.json
//!   study.json
//!   stock_ipos_processed.csv
//!   charts/*.svg  charts/*.png
//!   report.md  deck.md  report.docx  report.pdf
//! ```

mod manifest;

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

use ipolens_core::AnnotatedIpo;

use crate::charts::{render_charts, ChartArtifact};
use crate::config::{AnalysisConfig, StudyConfig};
use crate::export::{export_processed_csv, export_study_json};
use crate::reporting::document::{build_document, ReportMeta};
use crate::reporting::ReportFormat;
use crate::study::{Study, StudyResult};

pub use manifest::{
    read_manifest, write_manifest, ArtifactKind, ManifestEntry, RunManifest, MANIFEST_FILE,
    MANIFEST_VERSION,
};

pub const STUDY_JSON: &str = "study.json";
pub const PROCESSED_CSV: &str = "stock_ipos_processed.csv";
pub const CHART_DIR: &str = "charts";

/// Artifact paths returned after export.
#[derive(Debug, Clone, Default)]
pub struct ArtifactPaths {
    pub manifest: PathBuf,
    pub study_json: PathBuf,
    pub processed_csv: Option<PathBuf>,
    pub charts: Vec<ChartArtifact>,
    pub documents: Vec<(ReportFormat, PathBuf)>,
}

/// Manages writing all artifacts for a study.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write everything the config asks for, then the manifest.
    pub fn save_all(&self, study: &Study, config: &StudyConfig) -> Result<ArtifactPaths> {
        let study_json = self.write_study_json(&study.result)?;
        let processed_csv = if config.output.processed_csv {
            Some(self.write_processed_csv(&study.rows)?)
        } else {
            None
        };
        let charts = if config.output.charts {
            self.write_charts(study, &config.analysis)?
        } else {
            Vec::new()
        };
        let meta = ReportMeta::from_config(&config.output, Utc::now().date_naive());
        let documents = self.write_reports(&study.result, &charts, &meta, &config.output.formats)?;

        let mut paths = ArtifactPaths {
            manifest: self.output_dir.join(MANIFEST_FILE),
            study_json,
            processed_csv,
            charts,
            documents,
        };
        paths.manifest = self.write_manifest(&study.result, &paths)?;
        info!(
            dir = %self.output_dir.display(),
            charts = paths.charts.len(),
            documents = paths.documents.len(),
            "artifacts written"
        );
        Ok(paths)
    }

    pub fn write_study_json(&self, result: &StudyResult) -> Result<PathBuf> {
        let path = self.output_dir.join(STUDY_JSON);
        let json = export_study_json(result)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_processed_csv(&self, rows: &[AnnotatedIpo]) -> Result<PathBuf> {
        let path = self.output_dir.join(PROCESSED_CSV);
        let csv = export_processed_csv(rows)?;
        std::fs::write(&path, csv)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_charts(&self, study: &Study, analysis: &AnalysisConfig) -> Result<Vec<ChartArtifact>> {
        let dir = self.output_dir.join(CHART_DIR);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create chart directory {}", dir.display()))?;
        render_charts(study, analysis, &dir)
    }

    /// Render one document per format from a shared [`ReportDocument`](crate::reporting::ReportDocument).
    pub fn write_reports(
        &self,
        result: &StudyResult,
        charts: &[ChartArtifact],
        meta: &ReportMeta,
        formats: &[ReportFormat],
    ) -> Result<Vec<(ReportFormat, PathBuf)>> {
        let doc = build_document(result, charts, meta);
        let mut written = Vec::with_capacity(formats.len());
        for &format in formats {
            let bytes = format
                .renderer()
                .render(&doc)
                .with_context(|| format!("Failed to render {format} report"))?;
            let path = self.output_dir.join(format.file_name());
            std::fs::write(&path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(format = %format, path = %path.display(), "report written");
            written.push((format, path));
        }
        Ok(written)
    }

    pub fn write_manifest(&self, result: &StudyResult, paths: &ArtifactPaths) -> Result<PathBuf> {
        let mut files: Vec<(ArtifactKind, &Path)> = vec![(ArtifactKind::StudyJson, paths.study_json.as_path())];
        if let Some(csv) = &paths.processed_csv {
            files.push((ArtifactKind::ProcessedCsv, csv.as_path()));
        }
        for chart in &paths.charts {
            files.push((ArtifactKind::Chart, chart.path.as_path()));
            files.push((ArtifactKind::ChartImage, chart.png.as_path()));
        }
        files.extend(paths.documents.iter().map(|(f, p)| (ArtifactKind::from(*f), p.as_path())));

        let mut artifacts = Vec::with_capacity(files.len());
        for (kind, path) in files {
            let bytes = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat {}", path.display()))?
                .len();
            artifacts.push(ManifestEntry {
                kind,
                path: self.relative(path),
                bytes,
            });
        }

        let manifest = RunManifest {
            manifest_version: MANIFEST_VERSION,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            source: result.overview.source.display().to_string(),
            dataset_hash: result.overview.dataset_hash.clone(),
            rows: result.overview.rows_kept,
            artifacts,
        };
        let path = self.output_dir.join(MANIFEST_FILE);
        write_manifest(&path, &manifest)?;
        Ok(path)
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.output_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}
