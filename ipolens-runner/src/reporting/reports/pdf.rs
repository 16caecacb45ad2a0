//! PDF report on A4 pages using the built-in PDF fonts.
//!
//! Built-in fonts carry no metrics through printpdf, so wrapping uses an
//! average glyph width per face. Tables are set in Courier to keep columns
//! aligned. Figures are the PNG charts scaled to the text width.

use anyhow::{anyhow, Context, Result};
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use std::io::Cursor;

use super::figure_label;
use super::markdown::link;
use crate::reporting::document::{Block, Raster, ReportDocument};
use crate::reporting::tables::StatTable;
use crate::reporting::{ReportFormat, Renderer};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 20.0;
const TEXT_W: f32 = PAGE_W - 2.0 * MARGIN;

const PT_TO_MM: f32 = 0.3528;
const MM_PER_INCH: f32 = 25.4;

const BODY: f32 = 10.5;
const TABLE_MAX: f32 = 8.5;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Face {
    Regular,
    Bold,
    Italic,
    Mono,
}

impl Face {
    /// Average glyph width as a fraction of the font size.
    fn width_factor(self) -> f32 {
        match self {
            Face::Mono => 0.6,
            Face::Bold => 0.56,
            Face::Regular | Face::Italic => 0.5,
        }
    }
}

fn max_chars(face: Face, size: f32) -> usize {
    (TEXT_W / (size * PT_TO_MM * face.width_factor())).floor() as usize
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.4
}

/// Greedy word wrap at `width` characters. Words longer than a line are
/// placed on their own line.
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Restrict text to what the built-in WinAnsi fonts can show.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2022}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            '`' => '\'',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

struct Layout {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    mono: IndirectFontRef,
    y: f32,
    page: usize,
}

impl Layout {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(sanitize(title), Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let font = |f: BuiltinFont| {
            doc.add_builtin_font(f)
                .map_err(|e| anyhow!("failed to load PDF font: {e:?}"))
        };
        let regular = font(BuiltinFont::Helvetica)?;
        let bold = font(BuiltinFont::HelveticaBold)?;
        let italic = font(BuiltinFont::HelveticaOblique)?;
        let mono = font(BuiltinFont::Courier)?;
        let layer = doc.get_page(page).get_layer(layer);
        let layout = Self {
            doc,
            layer,
            regular,
            bold,
            italic,
            mono,
            y: PAGE_H - MARGIN,
            page: 1,
        };
        layout.footer();
        Ok(layout)
    }

    fn font(&self, face: Face) -> &IndirectFontRef {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Italic => &self.italic,
            Face::Mono => &self.mono,
        }
    }

    fn footer(&self) {
        self.layer.use_text(
            format!("Page {}", self.page),
            8.0,
            Mm(PAGE_W / 2.0 - 6.0),
            Mm(MARGIN / 2.0),
            &self.regular,
        );
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page += 1;
        self.y = PAGE_H - MARGIN;
        self.footer();
    }

    /// Start a new page unless `height` mm still fits.
    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn line(&mut self, text: &str, face: Face, size: f32, indent: f32) {
        let h = line_height(size);
        self.ensure(h);
        self.y -= h;
        self.layer
            .use_text(sanitize(text), size, Mm(MARGIN + indent), Mm(self.y), self.font(face));
    }

    fn paragraph(&mut self, text: &str, face: Face, size: f32) {
        for line in wrap(text, max_chars(face, size)) {
            self.line(&line, face, size, 0.0);
        }
        self.gap(2.0);
    }

    fn bullets(&mut self, items: &[String]) {
        let width = max_chars(Face::Regular, BODY).saturating_sub(3);
        for item in items {
            for (i, line) in wrap(item, width).iter().enumerate() {
                let text = if i == 0 { format!("- {line}") } else { line.clone() };
                self.line(&text, Face::Regular, BODY, if i == 0 { 0.0 } else { 3.5 });
            }
        }
        self.gap(2.0);
    }

    fn table(&mut self, table: &StatTable) {
        let text = table.to_text();
        let widest = text.lines().map(|l| l.chars().count()).max().unwrap_or(1).max(1);
        let fit = TEXT_W / (widest as f32 * PT_TO_MM * Face::Mono.width_factor());
        let size = fit.min(TABLE_MAX);

        let rows = text.lines().count() as f32;
        self.ensure(line_height(BODY) + rows * line_height(size));
        self.line(&table.title, Face::Bold, BODY, 0.0);
        for row in text.lines() {
            self.line(row, Face::Mono, size, 0.0);
        }
        if let Some(note) = &table.note {
            self.paragraph(note, Face::Italic, 8.0);
        } else {
            self.gap(3.0);
        }
    }

    /// Draw a PNG across the text width, keeping its aspect ratio.
    fn image(&mut self, raster: &Raster) -> Result<()> {
        let bytes = std::fs::read(&raster.file)
            .with_context(|| format!("failed to read chart {}", raster.file.display()))?;
        let decoder = PngDecoder::new(Cursor::new(bytes))
            .map_err(|e| anyhow!("failed to decode {}: {e}", raster.file.display()))?;
        let image = Image::try_from(decoder)
            .map_err(|e| anyhow!("failed to embed {}: {e}", raster.file.display()))?;

        let width = raster.width.max(1) as f32;
        let height_mm = TEXT_W * raster.height as f32 / width;
        self.ensure(height_mm + line_height(9.5) + 2.0);
        self.y -= height_mm;
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(self.y)),
                dpi: Some(width * MM_PER_INCH / TEXT_W),
                ..Default::default()
            },
        );
        self.gap(2.0);
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|e| anyhow!("failed to write PDF: {e:?}"))
    }
}

pub struct PdfRenderer;

impl Renderer for PdfRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Pdf
    }

    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>> {
        let mut pdf = Layout::new(&doc.title)?;

        pdf.gap(50.0);
        pdf.paragraph(&doc.title, Face::Bold, 24.0);
        if !doc.subtitle.is_empty() {
            pdf.paragraph(&doc.subtitle, Face::Italic, 14.0);
        }
        pdf.gap(6.0);
        for (label, value) in &doc.metadata {
            pdf.line(&format!("{label}: {value}"), Face::Regular, 11.0, 0.0);
        }

        let mut figure = 0;
        for section in &doc.sections {
            pdf.new_page();
            pdf.paragraph(&section.heading, Face::Bold, 16.0);
            for block in &section.blocks {
                match block {
                    Block::Subheading(text) => {
                        pdf.ensure(3.0 * line_height(12.0));
                        pdf.gap(2.0);
                        pdf.paragraph(text, Face::Bold, 12.0);
                    }
                    Block::Paragraph(text) => pdf.paragraph(text, Face::Regular, BODY),
                    Block::Bullets(items) => pdf.bullets(items),
                    Block::Table(table) => pdf.table(table),
                    Block::Figure { path, caption, raster } => {
                        figure += 1;
                        let label = figure_label(figure, caption);
                        match raster {
                            Some(raster) => {
                                pdf.image(raster)?;
                                pdf.paragraph(&label, Face::Italic, 9.5);
                            }
                            None => pdf.paragraph(
                                &format!("{label} (chart: {})", link(path)),
                                Face::Italic,
                                9.5,
                            ),
                        }
                    }
                }
            }
        }
        pdf.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::document::Section;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn wrap_keeps_words_and_width(words in prop::collection::vec("[a-z]{1,12}", 0..60), width in 12usize..80) {
            let text = words.join(" ");
            let lines = wrap(&text, width);
            for line in &lines {
                prop_assert!(line.chars().count() <= width);
            }
            prop_assert_eq!(lines.join(" "), text);
        }
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert_eq!(wrap("averyveryverylongword x", 5), vec!["averyveryverylongword", "x"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn sanitize_keeps_ascii() {
        assert_eq!(sanitize("S&P 500 \u{2022} 12% \u{2014} ok"), "S&P 500 - 12% - ok");
        assert_eq!(sanitize("caf\u{e9}"), "caf?");
    }

    #[test]
    fn body_lines_fit_the_page() {
        let n = max_chars(Face::Regular, BODY);
        assert!(n > 60 && n < 120, "{n}");
    }

    #[test]
    fn renders_a_pdf() {
        let mut table = StatTable::new("Returns", &["Group", "Mean"]);
        for i in 0..80 {
            table.push_row(vec![format!("G{i}"), "1.00%".into()]);
        }
        let doc = ReportDocument {
            title: "IPO Analysis".into(),
            subtitle: "PDF".into(),
            metadata: vec![("Date".into(), "today".into())],
            sections: vec![Section {
                heading: "Summary".into(),
                blocks: vec![
                    Block::Paragraph("Some words ".repeat(100)),
                    Block::Bullets(vec!["a".into()]),
                    Block::Table(table),
                ],
            }],
        };
        let bytes = PdfRenderer.render(&doc).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn figure_doc(raster: Option<Raster>) -> ReportDocument {
        ReportDocument {
            title: "IPO Analysis".into(),
            subtitle: String::new(),
            metadata: Vec::new(),
            sections: vec![Section {
                heading: "Day 0".into(),
                blocks: vec![Block::Figure {
                    path: "charts/chart.svg".into(),
                    caption: "Day 0 returns".into(),
                    raster,
                }],
            }],
        }
    }

    #[test]
    fn embeds_png_figures() {
        let dir = tempfile::tempdir().unwrap();
        let raster = crate::reporting::reports::test_raster(dir.path());
        let with_image = PdfRenderer.render(&figure_doc(Some(raster))).unwrap();
        let without = PdfRenderer.render(&figure_doc(None)).unwrap();
        assert!(contains(&with_image, b"/Image"));
        assert!(!contains(&without, b"/Image"));
    }

    #[test]
    fn missing_png_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let raster = Raster { file: dir.path().join("gone.png"), width: 10, height: 10 };
        let err = PdfRenderer.render(&figure_doc(Some(raster))).unwrap_err();
        assert!(err.to_string().contains("gone.png"), "{err}");
    }
}
