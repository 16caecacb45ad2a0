//! Marp slide deck.
//!
//! One title slide, then per section: an opening slide with the first
//! paragraph and any bullets, one slide per table, one slide per figure.

use anyhow::Result;
use std::fmt::Write;

use super::markdown::link;
use super::markdown_table;
use crate::reporting::document::{Block, ReportDocument};
use crate::reporting::{ReportFormat, Renderer};

const FRONT_MATTER: &str = "---\nmarp: true\ntheme: default\npaginate: true\nsize: 16:9\n---\n";
const SLIDE_BREAK: &str = "\n---\n\n";

/// Longest opening paragraph kept on a slide, in characters.
const MAX_PARAGRAPH: usize = 420;

pub struct DeckRenderer;

impl DeckRenderer {
    pub fn generate(&self, doc: &ReportDocument) -> String {
        let mut slides: Vec<String> = Vec::new();

        let mut title = format!("# {}\n\n", doc.title);
        if !doc.subtitle.is_empty() {
            let _ = writeln!(title, "## {}\n", doc.subtitle);
        }
        for (label, value) in &doc.metadata {
            let _ = writeln!(title, "{label}: {value}  ");
        }
        slides.push(title);

        for section in &doc.sections {
            let mut opening = format!("## {}\n", section.heading);
            if let Some(text) = section.blocks.iter().find_map(|b| match b {
                Block::Paragraph(t) => Some(t),
                _ => None,
            }) {
                let _ = write!(opening, "\n{}\n", shorten(text, MAX_PARAGRAPH));
            }
            for block in &section.blocks {
                if let Block::Bullets(items) = block {
                    opening.push('\n');
                    for item in items {
                        let _ = writeln!(opening, "- {item}");
                    }
                }
            }
            slides.push(opening);

            for block in &section.blocks {
                match block {
                    Block::Table(table) => {
                        let mut slide = format!("### {}\n\n", table.title);
                        slide.push_str(&markdown_table(table));
                        if let Some(note) = &table.note {
                            let _ = writeln!(slide, "\n*{note}*");
                        }
                        slides.push(slide);
                    }
                    Block::Figure { path, caption, .. } => {
                        slides.push(format!("### {caption}\n\n![w:1000]({})\n", link(path)));
                    }
                    _ => {}
                }
            }
        }

        let mut out = String::from(FRONT_MATTER);
        out.push('\n');
        out.push_str(&slides.join(SLIDE_BREAK));
        out
    }
}

impl Renderer for DeckRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Deck
    }

    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>> {
        Ok(self.generate(doc).into_bytes())
    }
}

/// Count slides in a Marp deck: `---` lines after the front matter, plus one.
pub fn count_slides(deck: &str) -> usize {
    let mut lines = deck.lines().map(str::trim_end);
    let mut separators = 0;
    if deck.starts_with("---") {
        // skip the front matter block
        lines.next();
        for line in lines.by_ref() {
            if line == "---" {
                break;
            }
        }
    }
    let mut content = false;
    for line in lines {
        if line == "---" {
            separators += 1;
        } else if !line.is_empty() {
            content = true;
        }
    }
    if content {
        separators + 1
    } else {
        0
    }
}

/// Cut at a word boundary and append an ellipsis.
fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    for word in text.split_whitespace() {
        if out.chars().count() + word.chars().count() + 1 > max {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out.push_str(" ...");
    out
}
