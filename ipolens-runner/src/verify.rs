//! Check a finished output directory.
//!
//! With a manifest, every listed file must exist with the recorded size.
//! Without one, the conventional file names are checked instead. Documents
//! also get a content check: JSON must load, markdown figure links must
//! resolve, binary formats must carry the right signature.

use anyhow::{bail, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::export::import_study_json;
use crate::reporting::artifacts::{
    read_manifest, ArtifactKind, ManifestEntry, MANIFEST_FILE, PROCESSED_CSV, STUDY_JSON,
};
use crate::reporting::reports::count_slides;
use crate::reporting::ReportFormat;

/// Result of checking one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactCheck {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub bytes: Option<u64>,
    pub problems: Vec<String>,
}

impl ArtifactCheck {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Structure found in the markdown report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkdownOutline {
    pub headings: Vec<String>,
    pub tables: usize,
    pub figures: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    pub dir: PathBuf,
    pub from_manifest: bool,
    pub checks: Vec<ArtifactCheck>,
    pub outline: Option<MarkdownOutline>,
    pub slides: Option<usize>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.checks.iter().all(ArtifactCheck::is_ok)
    }

    pub fn problem_count(&self) -> usize {
        self.checks.iter().map(|c| c.problems.len()).sum()
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Artifact check: {} ===", self.dir.display())?;
        if !self.from_manifest {
            writeln!(f, "(no {MANIFEST_FILE}; checked conventional file names)")?;
        }
        for check in &self.checks {
            let size = check
                .bytes
                .map_or_else(|| "missing".to_string(), |b| format!("{b} bytes"));
            let status = if check.is_ok() { "OK  " } else { "FAIL" };
            writeln!(f, "{status} {:<40} {size}", check.path.display())?;
            for problem in &check.problems {
                writeln!(f, "       - {problem}")?;
            }
        }
        if let Some(outline) = &self.outline {
            writeln!(f)?;
            writeln!(
                f,
                "Markdown report: {} headings, {} tables, {} figures",
                outline.headings.len(),
                outline.tables,
                outline.figures
            )?;
            for heading in &outline.headings {
                writeln!(f, "  {heading}")?;
            }
        }
        if let Some(slides) = self.slides {
            writeln!(f, "Slide deck: {slides} slides")?;
        }
        writeln!(f)?;
        if self.is_ok() {
            writeln!(f, "All {} artifacts OK", self.checks.len())
        } else {
            writeln!(f, "{} problem(s) found", self.problem_count())
        }
    }
}

/// Check the artifacts in `dir`.
pub fn verify_artifacts(dir: &Path) -> Result<VerifyReport> {
    if !dir.is_dir() {
        bail!("output directory {} does not exist", dir.display());
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    let (entries, from_manifest) = if manifest_path.exists() {
        let manifest = read_manifest(&manifest_path)?;
        (manifest.artifacts, true)
    } else {
        warn!(dir = %dir.display(), "no manifest found, checking conventional names");
        (conventional_entries(dir), false)
    };

    let mut report = VerifyReport {
        dir: dir.to_path_buf(),
        from_manifest,
        checks: Vec::with_capacity(entries.len()),
        outline: None,
        slides: None,
    };

    for entry in entries {
        let path = dir.join(&entry.path);
        let mut check = ArtifactCheck {
            kind: entry.kind,
            path: PathBuf::from(&entry.path),
            bytes: None,
            problems: Vec::new(),
        };
        let Ok(meta) = std::fs::metadata(&path) else {
            check.problems.push("file is missing".to_string());
            report.checks.push(check);
            continue;
        };
        check.bytes = Some(meta.len());
        if meta.len() == 0 {
            check.problems.push("file is empty".to_string());
        } else if from_manifest && meta.len() != entry.bytes {
            check.problems.push(format!(
                "size {} differs from manifest ({})",
                meta.len(),
                entry.bytes
            ));
        }
        if meta.len() > 0 {
            inspect_content(dir, &path, &mut check, &mut report)?;
        }
        debug!(path = %check.path.display(), ok = check.is_ok(), "artifact checked");
        report.checks.push(check);
    }

    if !report.checks.iter().any(|c| c.kind == ArtifactKind::StudyJson) {
        report.checks.push(ArtifactCheck {
            kind: ArtifactKind::StudyJson,
            path: PathBuf::from(STUDY_JSON),
            bytes: None,
            problems: vec!["file is missing".to_string()],
        });
    }
    Ok(report)
}

fn conventional_entries(dir: &Path) -> Vec<ManifestEntry> {
    let entry = |kind, path: &str| ManifestEntry {
        kind,
        path: path.to_string(),
        bytes: 0,
    };
    let mut entries = vec![entry(ArtifactKind::StudyJson, STUDY_JSON)];
    if dir.join(PROCESSED_CSV).exists() {
        entries.push(entry(ArtifactKind::ProcessedCsv, PROCESSED_CSV));
    }
    for format in ReportFormat::ALL {
        if dir.join(format.file_name()).exists() {
            entries.push(entry(ArtifactKind::from(format), format.file_name()));
        }
    }
    entries
}

fn inspect_content(
    dir: &Path,
    path: &Path,
    check: &mut ArtifactCheck,
    report: &mut VerifyReport,
) -> Result<()> {
    match check.kind {
        ArtifactKind::StudyJson => {
            let json = std::fs::read_to_string(path)?;
            if let Err(e) = import_study_json(&json) {
                check.problems.push(format!("{e:#}"));
            }
        }
        ArtifactKind::Markdown => {
            let text = std::fs::read_to_string(path)?;
            let outline = markdown_outline(&text);
            for link in figure_links(&text) {
                if !dir.join(&link).exists() {
                    check.problems.push(format!("figure {link} not found"));
                }
            }
            if outline.headings.is_empty() {
                check.problems.push("no headings".to_string());
            }
            report.outline = Some(outline);
        }
        ArtifactKind::Deck => {
            let text = std::fs::read_to_string(path)?;
            let slides = count_slides(&text);
            if slides == 0 {
                check.problems.push("deck has no slides".to_string());
            }
            report.slides = Some(slides);
        }
        ArtifactKind::Docx => expect_signature(path, b"PK", "DOCX", check)?,
        ArtifactKind::Pdf => expect_signature(path, b"%PDF", "PDF", check)?,
        ArtifactKind::Chart => expect_signature(path, b"<svg", "SVG", check)?,
        ArtifactKind::ChartImage => expect_signature(path, b"\x89PNG\r\n\x1a\n", "PNG", check)?,
        ArtifactKind::ProcessedCsv => {}
    }
    Ok(())
}

fn expect_signature(path: &Path, magic: &[u8], label: &str, check: &mut ArtifactCheck) -> Result<()> {
    let bytes = std::fs::read(path)?;
    let found = if magic == b"<svg" {
        bytes.windows(magic.len()).take(512).any(|w| w == magic)
    } else {
        bytes.starts_with(magic)
    };
    if !found {
        check.problems.push(format!("not a valid {label} file"));
    }
    Ok(())
}

/// Headings (`##` and `###`), pipe tables and images in a markdown report.
pub fn markdown_outline(text: &str) -> MarkdownOutline {
    let mut outline = MarkdownOutline::default();
    for line in text.lines() {
        let line = line.trim_end();
        if let Some(h) = line.strip_prefix("### ") {
            outline.headings.push(format!("  {h}"));
        } else if let Some(h) = line.strip_prefix("## ") {
            outline.headings.push(h.to_string());
        } else if line.starts_with("|:-") || line.starts_with("|---") {
            outline.tables += 1;
        } else if line.starts_with("![") {
            outline.figures += 1;
        }
    }
    outline
}

fn figure_links(text: &str) -> Vec<String> {
    text.lines()
        .filter(|l| l.starts_with("!["))
        .filter_map(|l| {
            let start = l.find("](")? + 2;
            let end = l[start..].find(')')? + start;
            Some(l[start..end].to_string())
        })
        .collect()
}
