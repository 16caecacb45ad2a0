//! Document renderers, one per [`ReportFormat`](super::ReportFormat).

mod deck;
mod docx;
mod markdown;
mod pdf;

pub use deck::{count_slides, DeckRenderer};
pub use docx::DocxRenderer;
pub use markdown::MarkdownRenderer;
pub use pdf::PdfRenderer;

use super::tables::StatTable;

/// GitHub-style pipe table. Numeric columns are right-aligned.
pub(crate) fn markdown_table(table: &StatTable) -> String {
    let escape = |cell: &str| cell.replace('|', "\\|");
    let mut out = String::new();
    out.push_str("| ");
    out.push_str(
        &table
            .headers
            .iter()
            .map(|h| escape(h))
            .collect::<Vec<_>>()
            .join(" | "),
    );
    out.push_str(" |\n|");
    for i in 0..table.headers.len() {
        out.push_str(if i == 0 { ":---|" } else { "---:|" });
    }
    out.push('\n');
    for row in &table.rows {
        out.push_str("| ");
        out.push_str(&row.iter().map(|c| escape(c)).collect::<Vec<_>>().join(" | "));
        out.push_str(" |\n");
    }
    out
}

pub(crate) fn figure_label(number: usize, caption: &str) -> String {
    format!("Figure {number}: {caption}")
}

/// Writes a small gradient PNG for renderer tests.
#[cfg(test)]
pub(crate) fn test_raster(dir: &std::path::Path) -> super::Raster {
    use printpdf::image_crate::{Rgb, RgbImage};

    let (width, height) = (40, 24);
    let file = dir.join("chart.png");
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 6) as u8, (y * 10) as u8, 128]))
        .save(&file)
        .unwrap();
    super::Raster { file, width, height }
}
