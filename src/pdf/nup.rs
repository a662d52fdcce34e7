//! Arranging several pages on one sheet

use std::path::Path;

use log::{debug, info};

use crate::error::Result;
use crate::geometry::{build_fit_transform, Alignment, PageSize, Rectangle, ScaleMode};
use crate::pdf::source::{DocumentSource, PdfDocument};
use crate::pdf::writer::{PageWriter, PdfWriter};

/// Options for n-up arrangement
#[derive(Debug, Clone, Copy, Default)]
pub struct NupOptions {
    /// Columns and rows per sheet; two pages per sheet when unset
    pub grid: Option<(usize, usize)>,
}

/// Columns and rows of a sheet whose first page is `first`
///
/// Without an explicit grid, portrait pages go side by side and landscape
/// pages are stacked.
pub fn sheet_grid(first: PageSize, grid: Option<(usize, usize)>) -> (usize, usize) {
    match grid {
        Some((cols, rows)) if cols > 0 && rows > 0 => (cols, rows),
        _ if first.width > first.height => (1, 2),
        _ => (2, 1),
    }
}

/// Place the pages of `source` in a grid, filling rows first
///
/// Each sheet is sized by its first page: one cell per grid slot, each as
/// large as that page. Pages of other sizes are scaled to fit their cell
/// and centered.
pub fn nup_pages<S, W>(source: &S, writer: &mut W, options: &NupOptions) -> Result<()>
where
    S: DocumentSource,
    W: PageWriter,
{
    let mut pages = source.pages()?.into_iter().peekable();

    while let Some(&first) = pages.peek() {
        let cell = source.page_size(first)?;
        let (cols, rows) = sheet_grid(cell, options.grid);

        debug!("Sheet starting at page {}: {}x{} grid", first.number(), cols, rows);
        writer.set_page_size(cell.width * cols as f64, cell.height * rows as f64)?;

        for row in 0..rows {
            for col in 0..cols {
                let Some(page) = pages.next() else {
                    break;
                };

                let slot = Rectangle::new(
                    col as f64 * cell.width,
                    row as f64 * cell.height,
                    cell.width,
                    cell.height,
                );
                let size = source.page_size(page)?;
                let transform =
                    build_fit_transform(&size.to_rect(), &slot, Alignment::Center, Alignment::Center, ScaleMode::Fit)?;
                writer.draw_page(page, &transform)?;
            }
        }

        writer.end_page()?;
    }

    Ok(())
}

/// Arrange the PDF at `input_path` n-up and save the result to `output_path`
pub fn nup_pdf(input_path: &Path, output_path: &Path, options: &NupOptions) -> Result<()> {
    let source = PdfDocument::load(input_path)?;
    let mut writer = PdfWriter::new(&source, output_path);

    info!("Arranging {} pages of {}", source.page_count(), input_path.display());
    nup_pages(&source, &mut writer, options)?;
    writer.finish()
}
