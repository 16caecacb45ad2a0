//! Word (.docx) report.
//!
//! Figures embed the PNG chart six inches wide above a numbered caption.
//! A figure without a PNG falls back to a caption naming the chart file.

use anyhow::{anyhow, Context, Result};
use docx_rs::{AlignmentType, BreakType, Docx, Paragraph, Pic, Run, Table, TableCell, TableRow};
use std::io::Cursor;

use super::figure_label;
use super::markdown::link;
use crate::reporting::document::{Block, Raster, ReportDocument};
use crate::reporting::tables::StatTable;
use crate::reporting::{ReportFormat, Renderer};

// Sizes are in half-points.
const TITLE: usize = 48;
const SUBTITLE: usize = 28;
const HEADING: usize = 32;
const SUBHEADING: usize = 26;
const BODY: usize = 22;
const TABLE_BODY: usize = 18;

const EMU_PER_INCH: u64 = 914_400;
const FIGURE_WIDTH_EMU: u64 = 6 * EMU_PER_INCH;

pub struct DocxRenderer;

impl DocxRenderer {
    pub fn build(&self, doc: &ReportDocument) -> Result<Docx> {
        let mut docx = Docx::new()
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(&doc.title).bold().size(TITLE))
                    .align(AlignmentType::Center),
            )
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(&doc.subtitle).italic().size(SUBTITLE))
                    .align(AlignmentType::Center),
            );
        for (label, value) in &doc.metadata {
            docx = docx.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(format!("{label}: ")).bold().size(BODY))
                    .add_run(Run::new().add_text(value).size(BODY))
                    .align(AlignmentType::Center),
            );
        }

        let mut figure = 0;
        for section in &doc.sections {
            docx = docx
                .add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)))
                .add_paragraph(
                    Paragraph::new().add_run(Run::new().add_text(&section.heading).bold().size(HEADING)),
                );
            for block in &section.blocks {
                docx = match block {
                    Block::Subheading(text) => docx.add_paragraph(
                        Paragraph::new().add_run(Run::new().add_text(text).bold().size(SUBHEADING)),
                    ),
                    Block::Paragraph(text) => docx.add_paragraph(body(text)),
                    Block::Bullets(items) => items
                        .iter()
                        .fold(docx, |d, item| d.add_paragraph(body(&format!("\u{2022} {item}")))),
                    Block::Table(table) => {
                        let mut d = docx
                            .add_paragraph(
                                Paragraph::new().add_run(Run::new().add_text(&table.title).bold().size(BODY)),
                            )
                            .add_table(stat_table(table));
                        if let Some(note) = &table.note {
                            d = d.add_paragraph(
                                Paragraph::new().add_run(Run::new().add_text(note).italic().size(TABLE_BODY)),
                            );
                        }
                        d
                    }
                    Block::Figure { path, caption, raster } => {
                        figure += 1;
                        let label = Run::new().add_text(figure_label(figure, caption)).italic().size(BODY);
                        match raster {
                            Some(raster) => docx
                                .add_paragraph(
                                    Paragraph::new()
                                        .add_run(Run::new().add_image(picture(raster)?))
                                        .align(AlignmentType::Center),
                                )
                                .add_paragraph(Paragraph::new().add_run(label).align(AlignmentType::Center)),
                            None => docx.add_paragraph(
                                Paragraph::new()
                                    .add_run(label)
                                    .add_run(Run::new().add_text(format!(" (chart: {})", link(path))).size(TABLE_BODY)),
                            ),
                        }
                    }
                };
            }
        }
        Ok(docx)
    }
}

/// PNG chart scaled to the figure width, keeping its aspect ratio.
fn picture(raster: &Raster) -> Result<Pic> {
    let bytes = std::fs::read(&raster.file)
        .with_context(|| format!("failed to read chart {}", raster.file.display()))?;
    let width = u64::from(raster.width.max(1));
    let height_emu = FIGURE_WIDTH_EMU * u64::from(raster.height) / width;
    let height_emu = u32::try_from(height_emu).context("chart is too tall to embed")?;
    Ok(Pic::new_with_dimensions(bytes, raster.width, raster.height)
        .size(FIGURE_WIDTH_EMU as u32, height_emu))
}

impl Renderer for DocxRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Docx
    }

    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.build(doc)?
            .build()
            .pack(&mut buf)
            .map_err(|e| anyhow!("failed to pack DOCX: {e:?}"))?;
        Ok(buf.into_inner())
    }
}

fn body(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text).size(BODY))
}

fn stat_table(table: &StatTable) -> Table {
    let cell = |text: &str, bold: bool| {
        let run = Run::new().add_text(text).size(TABLE_BODY);
        let run = if bold { run.bold() } else { run };
        TableCell::new().add_paragraph(Paragraph::new().add_run(run))
    };
    let mut rows = vec![TableRow::new(
        table.headers.iter().map(|h| cell(h, true)).collect(),
    )];
    rows.extend(
        table
            .rows
            .iter()
            .map(|r| TableRow::new(r.iter().map(|c| cell(c, false)).collect())),
    );
    Table::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::document::Section;

    #[test]
    fn renders_a_zip_container() {
        let mut table = StatTable::new("Returns", &["Group", "Mean"]);
        table.push_row(vec!["SPAC".into(), "1.00%".into()]);
        let doc = ReportDocument {
            title: "IPO Analysis".into(),
            subtitle: "Word".into(),
            metadata: vec![("Date".into(), "today".into())],
            sections: vec![Section {
                heading: "Summary".into(),
                blocks: vec![
                    Block::Paragraph("Text".into()),
                    Block::Bullets(vec!["a".into()]),
                    Block::Table(table),
                ],
            }],
        };
        let bytes = DocxRenderer.render(&doc).unwrap();
        assert!(bytes.len() > 1000);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn embeds_png_figures() {
        let dir = tempfile::tempdir().unwrap();
        let raster = crate::reporting::reports::test_raster(dir.path());
        let png = std::fs::read(&raster.file).unwrap();
        let doc = ReportDocument {
            title: "IPO Analysis".into(),
            subtitle: String::new(),
            metadata: Vec::new(),
            sections: vec![Section {
                heading: "Day 0".into(),
                blocks: vec![Block::Figure {
                    path: "charts/chart.svg".into(),
                    caption: "Day 0 returns".into(),
                    raster: Some(raster),
                }],
            }],
        };
        let bytes = DocxRenderer.render(&doc).unwrap();
        assert!(bytes.windows(11).any(|w| w == b"word/media/"));
        assert!(bytes.len() > png.len());

        let missing = Raster { file: dir.path().join("gone.png"), width: 1, height: 1 };
        assert!(picture(&missing).is_err());
    }
}
