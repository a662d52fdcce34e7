//! Replacing page content with rendered images
//!
//! Pages are rendered at a high resolution and embedded as images. With
//! `chop`, white paper is made transparent and only the opaque parts of the
//! page are embedded, each as its own image; repeated parts are stored once.

use std::path::Path;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geometry::{AffineTransform, PageSize, Rectangle};
use crate::pdf::render::{PdftocairoRasterizer, Rasterizer};
use crate::pdf::source::{DocumentSource, PageHandle, PdfDocument};
use crate::pdf::writer::{PageWriter, PdfWriter};
use crate::raster::buffer::{Color, PixelBuffer, PixelRect};
use crate::raster::chop::{decompose, matte_white, ContentHash, DecomposeOptions};

/// Options for rasterizing
#[derive(Debug, Clone)]
pub struct RasterizeOptions {
    pub dpi: f64,
    /// Split each page into opaque regions; implies `transparent`
    pub chop: bool,
    /// Make white pixels transparent
    pub transparent: bool,
    pub grayscale: bool,
    /// Outline chopped regions in red
    pub debug: bool,
    /// Fail pages that split into more regions than this
    pub region_limit: Option<usize>,
    /// Abort on rendering failures instead of keeping the page as it is
    pub strict: bool,
}

impl Default for RasterizeOptions {
    fn default() -> Self {
        Self {
            dpi: 600.0,
            chop: false,
            transparent: false,
            grayscale: false,
            debug: false,
            region_limit: None,
            strict: false,
        }
    }
}

/// Scale from pixel positions to page space
struct PixelScale {
    x: f64,
    y: f64,
}

impl PixelScale {
    fn new(image: &PixelBuffer, page: PageSize) -> Self {
        Self {
            x: page.width / image.width() as f64,
            y: page.height / image.height() as f64,
        }
    }

    fn to_page(&self, rect: &PixelRect) -> Rectangle {
        Rectangle::new(
            rect.x as f64 * self.x,
            rect.y as f64 * self.y,
            rect.width as f64 * self.x,
            rect.height as f64 * self.y,
        )
    }
}

/// Draw the rendered `image` of a page of size `size`
fn draw_rendered<W: PageWriter>(
    writer: &mut W,
    page: PageHandle,
    mut image: PixelBuffer,
    size: PageSize,
    options: &RasterizeOptions,
) -> Result<()> {
    image.ensure_analyzable()?;
    let scale = PixelScale::new(&image, size);

    if options.grayscale {
        image.to_grayscale();
    }
    if options.transparent || options.chop {
        matte_white(&mut image);
    }

    if !options.chop {
        let hash = ContentHash::of(&image);
        return writer.draw_image(&image, &scale.to_page(&image.bounds()), &hash);
    }

    let decompose_options = DecomposeOptions {
        debug_outlines: options.debug,
        region_limit: options.region_limit,
    };
    let regions = decompose(image, &decompose_options)?;
    debug!("Page {}: {} regions", page.number(), regions.len());

    for region in &regions {
        writer.draw_image(&region.pixels, &scale.to_page(&region.rect), &region.content_hash)?;
    }
    Ok(())
}

/// Rasterize every page of `source` into `writer`
pub fn rasterize_pages<S, R, W>(source: &S, rasterizer: &R, writer: &mut W, options: &RasterizeOptions) -> Result<()>
where
    S: DocumentSource,
    R: Rasterizer,
    W: PageWriter,
{
    for page in source.pages()? {
        let size = source.page_size(page)?;
        writer.set_page_size(size.width, size.height)?;

        match rasterizer.render(page, options.dpi, Color::WHITE) {
            Ok(image) => draw_rendered(writer, page, image, size, options)?,
            Err(Error::RenderBackend(reason)) if !options.strict => {
                warn!("Page {}: rendering failed, keeping original: {}", page.number(), reason);
                writer.draw_page(page, &AffineTransform::identity())?;
            }
            Err(e) => return Err(e),
        }

        writer.end_page()?;
    }

    Ok(())
}

/// Rasterize the PDF at `input_path` and save the result to `output_path`
pub fn rasterize_pdf(input_path: &Path, output_path: &Path, options: &RasterizeOptions) -> Result<()> {
    let source = PdfDocument::load(input_path)?;
    let rasterizer = PdftocairoRasterizer::new(input_path);
    let mut writer = PdfWriter::new(&source, output_path);

    info!(
        "Rasterizing {} pages of {} at {} dpi",
        source.page_count(),
        input_path.display(),
        options.dpi
    );
    rasterize_pages(&source, &rasterizer, &mut writer, options)?;
    info!("Embedded {} distinct images", writer.image_count());
    writer.finish()
}
