//! Reporting pipeline: a format-neutral document, one renderer per output
//! format, and the artifact manager that writes everything to disk.

pub mod artifacts;
pub mod document;
pub mod reports;
pub mod tables;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use artifacts::{ArtifactManager, ArtifactPaths};
pub use document::{build_document, Block, Raster, ReportDocument, ReportMeta, Section};
pub use tables::StatTable;

/// Output document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Markdown,
    /// Marp-flavoured markdown slide deck.
    Deck,
    Docx,
    Pdf,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 4] = [
        ReportFormat::Markdown,
        ReportFormat::Deck,
        ReportFormat::Docx,
        ReportFormat::Pdf,
    ];

    /// File name inside the output directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ReportFormat::Markdown => "report.md",
            ReportFormat::Deck => "deck.md",
            ReportFormat::Docx => "report.docx",
            ReportFormat::Pdf => "report.pdf",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Markdown => "markdown",
            ReportFormat::Deck => "deck",
            ReportFormat::Docx => "docx",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn renderer(self) -> Box<dyn Renderer> {
        match self {
            ReportFormat::Markdown => Box::new(reports::MarkdownRenderer),
            ReportFormat::Deck => Box::new(reports::DeckRenderer),
            ReportFormat::Docx => Box::new(reports::DocxRenderer),
            ReportFormat::Pdf => Box::new(reports::PdfRenderer),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(ReportFormat::Markdown),
            "deck" | "slides" => Ok(ReportFormat::Deck),
            "docx" | "word" => Ok(ReportFormat::Docx),
            "pdf" => Ok(ReportFormat::Pdf),
            other => Err(format!(
                "unknown report format '{other}' (expected md, deck, docx or pdf)"
            )),
        }
    }
}

/// Turns a [`ReportDocument`] into the bytes of one output format.
pub trait Renderer {
    fn format(&self) -> ReportFormat;

    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>>;
}
