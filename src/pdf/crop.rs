//! Whitespace cropping
//!
//! Each page is rendered, its blank margins detected, and the remaining
//! content placed onto an output page of the content's size (or a requested
//! target size). By default all pages are cropped by the same amount, the
//! smallest margin found on each side across the document, so facing pages
//! stay aligned.

use std::path::Path;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::geometry::{build_fit_transform, Alignment, PageSize, ScaleMode};
use crate::layout::Margins;
use crate::pdf::render::{PdftocairoRasterizer, Rasterizer};
use crate::pdf::source::{DocumentSource, PageHandle, PdfDocument};
use crate::pdf::writer::{PageWriter, PdfWriter};
use crate::raster::bounds::{aggregate_bounds, detect_bounds, BoundsResult, DetectionParams, Sides};
use crate::raster::buffer::Color;

/// Options for cropping
#[derive(Debug, Clone)]
pub struct CropOptions {
    /// Color of the page background
    pub background: Color,
    /// Resolution used for detecting content
    pub dpi: f64,
    /// Crop every page by its own margins instead of the common minimum
    pub per_page: bool,
    /// Per-channel tolerance when comparing against the background
    pub fuzz: u8,
    /// Non-background pixels a row or column may contain and still be cropped
    pub mismatch_budget: usize,
    /// Sides that are left uncropped
    pub keep: Sides,
    /// Whitespace left around the content
    pub margin: Margins,
    /// Scale output pages to this width in points
    pub target_width: Option<f64>,
    /// Scale output pages to this height in points
    pub target_height: Option<f64>,
    /// Abort on rendering failures instead of leaving the page uncropped
    pub strict: bool,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            dpi: 72.0,
            per_page: false,
            fuzz: 0,
            mismatch_budget: 0,
            keep: Sides::none(),
            margin: Margins::default(),
            target_width: None,
            target_height: None,
            strict: false,
        }
    }
}

impl CropOptions {
    fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            background: self.background,
            fuzz: self.fuzz,
            mismatch_budget: self.mismatch_budget,
        }
    }
}

/// Output page size for cropped content of size `cropped`
///
/// With both targets the content is scaled to fit inside them; with one, the
/// other side follows the aspect ratio. Sides are rounded to whole points.
pub fn fit_output_size(cropped: PageSize, target_width: Option<f64>, target_height: Option<f64>) -> PageSize {
    let scale = match (target_width, target_height) {
        (Some(w), Some(h)) => (w / cropped.width).min(h / cropped.height),
        (Some(w), None) => w / cropped.width,
        (None, Some(h)) => h / cropped.height,
        (None, None) => 1.0,
    };

    PageSize::new(
        (cropped.width * scale).round().max(1.0),
        (cropped.height * scale).round().max(1.0),
    )
}

/// Detect the whitespace of one page
fn measure_page<R: Rasterizer>(
    rasterizer: &R,
    page: PageHandle,
    size: PageSize,
    options: &CropOptions,
) -> Result<BoundsResult> {
    let image = match rasterizer.render(page, options.dpi, options.background) {
        Ok(image) => image,
        Err(Error::RenderBackend(reason)) if !options.strict => {
            warn!("Page {}: rendering failed, not cropping: {}", page.number(), reason);
            return Ok(BoundsResult::zero());
        }
        Err(e) => return Err(e),
    };

    let bounds = detect_bounds(&image, size, &options.detection_params())?;
    debug!(
        "Page {}: whitespace top {:.1} right {:.1} bottom {:.1} left {:.1}",
        page.number(),
        bounds.top,
        bounds.right,
        bounds.bottom,
        bounds.left
    );
    Ok(bounds)
}

/// Crop every page of `source` into `writer`
pub fn crop_pages<S, R, W>(source: &S, rasterizer: &R, writer: &mut W, options: &CropOptions) -> Result<()>
where
    S: DocumentSource,
    R: Rasterizer,
    W: PageWriter,
{
    let pages: Vec<(PageHandle, PageSize)> = source
        .pages()?
        .into_iter()
        .map(|page| Ok((page, source.page_size(page)?)))
        .collect::<Result<_>>()?;

    let measured: Vec<BoundsResult> = pages
        .par_iter()
        .map(|&(page, size)| measure_page(rasterizer, page, size, options))
        .collect::<Result<_>>()?;

    let uniform = if options.per_page {
        None
    } else {
        let common = aggregate_bounds(&measured).unwrap_or_default();
        info!(
            "Cropping all pages by top {:.1} right {:.1} bottom {:.1} left {:.1}",
            common.top, common.right, common.bottom, common.left
        );
        Some(common)
    };

    for (&(page, size), page_bounds) in pages.iter().zip(&measured) {
        let bounds = uniform
            .unwrap_or(*page_bounds)
            .without_sides(options.keep)
            .shrink_by(&options.margin);

        let content = bounds.content_rect(size);
        let output = fit_output_size(
            PageSize::new(content.width, content.height),
            options.target_width,
            options.target_height,
        );

        let transform = build_fit_transform(
            &content,
            &output.to_rect(),
            Alignment::Center,
            Alignment::Center,
            ScaleMode::Fit,
        )?;

        writer.set_page_size(output.width, output.height)?;
        writer.draw_page(page, &transform)?;
        writer.end_page()?;
    }

    Ok(())
}

/// Crop the PDF at `input_path` and save the result to `output_path`
pub fn crop_pdf(input_path: &Path, output_path: &Path, options: &CropOptions) -> Result<()> {
    let source = PdfDocument::load(input_path)?;
    let rasterizer = PdftocairoRasterizer::new(input_path);
    let mut writer = PdfWriter::new(&source, output_path);

    info!("Cropping {} pages of {}", source.page_count(), input_path.display());
    crop_pages(&source, &rasterizer, &mut writer, options)?;
    writer.finish()
}
