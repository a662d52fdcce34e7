//! Page rasterization via `pdftocairo` (poppler-utils)

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::RgbaImage;
use log::debug;

use crate::error::{Error, Result};
use crate::pdf::source::PageHandle;
use crate::raster::buffer::{Color, PixelBuffer};

/// Renders pages into premultiplied ARGB pixel buffers
///
/// Implementations must be shareable between threads; the crop tool renders
/// pages in parallel.
pub trait Rasterizer: Sync {
    /// Render `page` at `dpi` pixels per inch onto `background`
    ///
    /// The buffer covers the page's CropBox as displayed (after `/Rotate`)
    /// and is `round(page_width / 72 * dpi)` by
    /// `round(page_height / 72 * dpi)` pixels.
    fn render(&self, page: PageHandle, dpi: f64, background: Color) -> Result<PixelBuffer>;
}

/// Rasterizer that runs the `pdftocairo` program on the input file
///
/// Pages are rendered with a transparent background and then composited
/// onto the requested color.
#[derive(Debug, Clone)]
pub struct PdftocairoRasterizer {
    pdf_path: PathBuf,
    program: PathBuf,
}

impl PdftocairoRasterizer {
    pub fn new(pdf_path: impl Into<PathBuf>) -> Self {
        Self {
            pdf_path: pdf_path.into(),
            program: PathBuf::from("pdftocairo"),
        }
    }

    /// Use a specific `pdftocairo` executable instead of searching `PATH`
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Command line writing `page` to `<prefix>.png`
    fn command(&self, page: PageHandle, dpi: f64, prefix: &Path) -> Command {
        let number = page.number().to_string();

        let mut command = Command::new(&self.program);
        command
            .arg("-png")
            .arg("-transp")
            .arg("-cropbox")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(&number)
            .arg("-l")
            .arg(&number)
            .arg("-singlefile")
            .arg(self.pdf_path.as_os_str())
            .arg(prefix.as_os_str());
        command
    }
}

/// Composite straight-alpha RGBA pixels over an opaque background
fn flatten_onto(rendered: &RgbaImage, background: Color) -> Result<PixelBuffer> {
    let blend = |src: u8, bg: u8, alpha: u8| -> u8 {
        let (src, bg, alpha) = (u32::from(src), u32::from(bg), u32::from(alpha));
        ((src * alpha + bg * (255 - alpha) + 127) / 255) as u8
    };

    let mut bytes = Vec::with_capacity(rendered.as_raw().len());
    for px in rendered.pixels() {
        let [r, g, b, a] = px.0;
        bytes.extend_from_slice(&[
            blend(r, background.r, a),
            blend(g, background.g, a),
            blend(b, background.b, a),
            0xff,
        ]);
    }

    let (width, height) = rendered.dimensions();
    PixelBuffer::from_rgba8(width as usize, height as usize, &bytes)
}

impl Rasterizer for PdftocairoRasterizer {
    fn render(&self, page: PageHandle, dpi: f64, background: Color) -> Result<PixelBuffer> {
        if !(dpi.is_finite() && dpi > 0.0) {
            return Err(Error::RenderBackend(format!("invalid resolution {} dpi", dpi)));
        }

        let tmp_dir = tempfile::TempDir::new()
            .map_err(|e| Error::RenderBackend(format!("Failed to create temp dir: {}", e)))?;
        let prefix = tmp_dir.path().join("page");

        debug!(
            "Rendering page {} of {} at {} dpi onto {}",
            page.number(),
            self.pdf_path.display(),
            dpi,
            background
        );

        let output = self.command(page, dpi, &prefix).output().map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::RenderBackend(format!(
                "{} not found. Install poppler-utils to render pages",
                self.program.display()
            )),
            _ => Error::RenderBackend(format!("Failed to run {}: {}", self.program.display(), e)),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::RenderBackend(format!(
                "pdftocairo failed for page {}: {}",
                page.number(),
                stderr.trim()
            )));
        }

        let png_path = prefix.with_extension("png");
        let decoded = image::open(&png_path)
            .map_err(|e| {
                Error::RenderBackend(format!("Failed to decode rendered page {}: {}", page.number(), e))
            })?
            .to_rgba8();

        flatten_onto(&decoded, background)
    }
}
