//! Markdown report.

use anyhow::Result;
use std::fmt::Write;
use std::path::Path;

use super::{figure_label, markdown_table};
use crate::reporting::document::{Block, ReportDocument};
use crate::reporting::{ReportFormat, Renderer};

pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn generate(&self, doc: &ReportDocument) -> String {
        let mut out = format!("# {}\n\n", doc.title);
        if !doc.subtitle.is_empty() {
            let _ = writeln!(out, "*{}*\n", doc.subtitle);
        }
        for (label, value) in &doc.metadata {
            let _ = writeln!(out, "**{label}:** {value}  ");
        }
        out.push_str("\n---\n\n## Contents\n\n");
        for (i, section) in doc.sections.iter().enumerate() {
            let _ = writeln!(out, "{}. [{}](#{})", i + 1, section.heading, anchor(&section.heading));
        }

        let mut figure = 0;
        for section in &doc.sections {
            let _ = write!(out, "\n## {}\n", section.heading);
            for block in &section.blocks {
                out.push('\n');
                match block {
                    Block::Subheading(text) => {
                        let _ = writeln!(out, "### {text}");
                    }
                    Block::Paragraph(text) => {
                        let _ = writeln!(out, "{text}");
                    }
                    Block::Bullets(items) => {
                        for item in items {
                            let _ = writeln!(out, "- {item}");
                        }
                    }
                    Block::Table(table) => {
                        let _ = writeln!(out, "**{}**\n", table.title);
                        out.push_str(&markdown_table(table));
                        if let Some(note) = &table.note {
                            let _ = writeln!(out, "\n*{note}*");
                        }
                    }
                    Block::Figure { path, caption, .. } => {
                        figure += 1;
                        let _ = writeln!(out, "![{caption}]({})\n", link(path));
                        let _ = writeln!(out, "*{}*", figure_label(figure, caption));
                    }
                }
            }
        }
        out
    }
}

impl Renderer for MarkdownRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Markdown
    }

    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>> {
        Ok(self.generate(doc).into_bytes())
    }
}

/// Relative link with forward slashes.
pub(crate) fn link(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// GitHub heading anchor: lowercase, spaces to dashes, punctuation dropped.
fn anchor(heading: &str) -> String {
    heading
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            '-' | '_' => Some(c),
            c if c.is_alphanumeric() => Some(c.to_ascii_lowercase()),
            _ => None,
        })
        .collect()
}
