//! Stacking the pages of other PDFs on top of an input

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::geometry::AffineTransform;
use crate::pdf::source::{DocumentSource, PageHandle, PdfDocument};
use crate::pdf::writer::{PageWriter, PdfWriter};

/// Options for overlaying pages
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayOptions {
    /// Shift of every overlay page, in points (x right, y down)
    pub offset: (f64, f64),
}

/// Draw every page of `source` with the matching page of each layer on top
///
/// `layers[k][i]` is drawn over page `i`, in layer order. Layers with fewer
/// pages than `source` leave the remaining pages uncovered. Output pages
/// keep the size of their `source` page.
pub fn overlay_pages<S, W>(
    source: &S,
    layers: &[Vec<PageHandle>],
    writer: &mut W,
    options: &OverlayOptions,
) -> Result<()>
where
    S: DocumentSource,
    W: PageWriter,
{
    let (dx, dy) = options.offset;
    let shift = AffineTransform::translate(dx, dy);

    for page in source.pages()? {
        let size = source.page_size(page)?;
        writer.set_page_size(size.width, size.height)?;
        writer.draw_page(page, &AffineTransform::identity())?;

        for layer in layers {
            if let Some(&overlay) = layer.get(page.index) {
                writer.draw_page(overlay, &shift)?;
            }
        }

        debug!(
            "Page {}: {} of {} layers",
            page.number(),
            layers.iter().filter(|layer| layer.len() > page.index).count(),
            layers.len()
        );
        writer.end_page()?;
    }

    Ok(())
}

/// Overlay the PDFs in `overlay_paths` onto the PDF at `input_path`
pub fn overlay_pdf(
    input_path: &Path,
    overlay_paths: &[PathBuf],
    output_path: &Path,
    options: &OverlayOptions,
) -> Result<()> {
    if overlay_paths.is_empty() {
        return Err(Error::General("Expected at least one overlay file".to_string()));
    }

    let mut source = PdfDocument::load(input_path)?;
    let mut layers = Vec::with_capacity(overlay_paths.len());
    for path in overlay_paths {
        let overlay = PdfDocument::load(path)?;
        layers.push(source.import_pages(overlay));
    }

    info!(
        "Overlaying {} files onto {} pages of {}",
        layers.len(),
        source.page_count(),
        input_path.display()
    );

    let mut writer = PdfWriter::new(&source, output_path);
    overlay_pages(&source, &layers, &mut writer, options)?;
    writer.finish()
}
