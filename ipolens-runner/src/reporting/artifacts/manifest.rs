//! Output manifest (JSON): what a run wrote, and how large each file was.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::reporting::ReportFormat;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    StudyJson,
    ProcessedCsv,
    /// Vector chart (SVG).
    Chart,
    /// Raster chart (PNG) embedded by DOCX and PDF.
    ChartImage,
    Markdown,
    Deck,
    Docx,
    Pdf,
}

impl From<ReportFormat> for ArtifactKind {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Markdown => ArtifactKind::Markdown,
            ReportFormat::Deck => ArtifactKind::Deck,
            ReportFormat::Docx => ArtifactKind::Docx,
            ReportFormat::Pdf => ArtifactKind::Pdf,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub kind: ArtifactKind,
    /// Path relative to the output directory, with forward slashes.
    pub path: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub dataset_hash: String,
    pub rows: usize,
    pub artifacts: Vec<ManifestEntry>,
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest).context("Failed to serialize run manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<RunManifest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let manifest: RunManifest = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse manifest {}", path.display()))?;
    if manifest.manifest_version > MANIFEST_VERSION {
        bail!(
            "unsupported manifest version {} (max supported: {})",
            manifest.manifest_version,
            MANIFEST_VERSION
        );
    }
    Ok(manifest)
}
