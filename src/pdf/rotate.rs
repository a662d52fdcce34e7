//! Rotating pages by arbitrary angles

use std::path::Path;

use log::info;

use crate::error::Result;
use crate::geometry::{compute_bounding_rect, AffineTransform, PageSize};
use crate::pdf::source::{DocumentSource, PdfDocument};
use crate::pdf::writer::{PageWriter, PdfWriter};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotateOptions {
    /// Counter-clockwise rotation in degrees
    pub angle: f64,
}

/// Output page size and transform for rotating a page of size `size`
///
/// The output page is the bounding box of the rotated page, so no content is
/// clipped.
pub fn rotation_layout(size: PageSize, angle_degrees: f64) -> (PageSize, AffineTransform) {
    // y points down, so a counter-clockwise turn is a negative angle
    let rotation = AffineTransform::rotate(-angle_degrees.to_radians());
    let bounds = compute_bounding_rect(&size.to_rect(), &rotation);

    let transform = rotation.then(&AffineTransform::translate(-bounds.x, -bounds.y));
    (PageSize::new(bounds.width, bounds.height), transform)
}

pub fn rotate_pages<S, W>(source: &S, writer: &mut W, options: &RotateOptions) -> Result<()>
where
    S: DocumentSource,
    W: PageWriter,
{
    for page in source.pages()? {
        let (size, transform) = rotation_layout(source.page_size(page)?, options.angle);

        writer.set_page_size(size.width, size.height)?;
        writer.draw_page(page, &transform)?;
        writer.end_page()?;
    }

    Ok(())
}

/// Rotate every page of the PDF at `input_path` and save the result to `output_path`
pub fn rotate_pdf(input_path: &Path, output_path: &Path, options: &RotateOptions) -> Result<()> {
    let source = PdfDocument::load(input_path)?;
    let mut writer = PdfWriter::new(&source, output_path);

    info!(
        "Rotating {} pages of {} by {} degrees",
        source.page_count(),
        input_path.display(),
        options.angle
    );
    rotate_pages(&source, &mut writer, options)?;
    writer.finish()
}
