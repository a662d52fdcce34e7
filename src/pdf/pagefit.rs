//! Fitting pages onto a paper size

use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::geometry::{build_fit_transform, Alignment, AffineTransform, PageSize, Rectangle, ScaleMode};
use crate::layout::{Margins, Orientation};
use crate::pdf::source::{DocumentSource, PdfDocument};
use crate::pdf::writer::{PageWriter, PdfWriter};

/// A4 portrait in points
pub const DEFAULT_PAPER: PageSize = PageSize {
    width: 595.0,
    height: 842.0,
};

/// Options for fitting pages onto paper
#[derive(Debug, Clone)]
pub struct PagefitOptions {
    pub paper: PageSize,
    pub orientation: Orientation,
    /// Space kept free on the paper
    pub margins: Margins,
    pub halign: Alignment,
    pub valign: Alignment,
    pub scale: ScaleMode,
}

impl Default for PagefitOptions {
    fn default() -> Self {
        Self {
            paper: DEFAULT_PAPER,
            orientation: Orientation::Auto,
            margins: Margins::default(),
            halign: Alignment::Center,
            valign: Alignment::Center,
            scale: ScaleMode::Fit,
        }
    }
}

/// The printable area of `paper` inside `margins`
pub fn printable_area(paper: PageSize, margins: &Margins) -> Result<Rectangle> {
    let horizontal = margins.left.pt() + margins.right.pt();
    let vertical = margins.top.pt() + margins.bottom.pt();

    if horizontal >= paper.width || vertical >= paper.height {
        return Err(Error::InvalidMargin {
            spec: format!(
                "{},{},{},{}",
                margins.top.pt(),
                margins.right.pt(),
                margins.bottom.pt(),
                margins.left.pt()
            ),
            reason: format!("margins leave no space on {}x{}pt paper", paper.width, paper.height),
        });
    }

    Ok(Rectangle::new(
        margins.left.pt(),
        margins.top.pt(),
        paper.width - horizontal,
        paper.height - vertical,
    ))
}

/// Output page size and placement for one source page
pub fn fit_layout(source: PageSize, options: &PagefitOptions) -> Result<(PageSize, AffineTransform)> {
    let paper = options.orientation.apply(options.paper, source);
    let area = printable_area(paper, &options.margins)?;

    let transform = build_fit_transform(&source.to_rect(), &area, options.halign, options.valign, options.scale)?;
    Ok((paper, transform))
}

/// Place every page of `source` onto paper
pub fn pagefit_pages<S, W>(source: &S, writer: &mut W, options: &PagefitOptions) -> Result<()>
where
    S: DocumentSource,
    W: PageWriter,
{
    for page in source.pages()? {
        let size = source.page_size(page)?;
        let (paper, transform) = fit_layout(size, options)?;

        debug!(
            "Page {}: {}x{} onto {}x{}",
            page.number(),
            size.width,
            size.height,
            paper.width,
            paper.height
        );

        writer.set_page_size(paper.width, paper.height)?;
        writer.draw_page(page, &transform)?;
        writer.end_page()?;
    }

    Ok(())
}

/// Fit the PDF at `input_path` onto paper and save the result to `output_path`
pub fn pagefit_pdf(input_path: &Path, output_path: &Path, options: &PagefitOptions) -> Result<()> {
    let source = PdfDocument::load(input_path)?;
    let mut writer = PdfWriter::new(&source, output_path);

    info!(
        "Fitting {} pages of {} onto {}x{}pt paper",
        source.page_count(),
        input_path.display(),
        options.paper.width,
        options.paper.height
    );
    pagefit_pages(&source, &mut writer, options)?;
    writer.finish()
}
