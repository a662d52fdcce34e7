//! PDF tools built on the geometry and raster engine

pub mod crop;
pub mod metadata;
pub mod nup;
pub mod overlay;
pub mod pagefit;
pub mod rasterize;
pub mod render;
pub mod rotate;
pub mod source;
pub mod writer;

// Re-export commonly used items
pub use crop::{crop_pages, crop_pdf, fit_output_size, CropOptions};
pub use metadata::{count_pages, document_metadata, extract_metadata, PdfMetadata};
pub use nup::{nup_pages, nup_pdf, sheet_grid, NupOptions};
pub use overlay::{overlay_pages, overlay_pdf, OverlayOptions};
pub use pagefit::{fit_layout, pagefit_pages, pagefit_pdf, PagefitOptions};
pub use rasterize::{rasterize_pages, rasterize_pdf, RasterizeOptions};
pub use render::{PdftocairoRasterizer, Rasterizer};
pub use rotate::{rotate_pages, rotate_pdf, rotation_layout, RotateOptions};
pub use source::{DocumentSource, PageBox, PageHandle, PdfDocument};
pub use writer::{PageWriter, PdfWriter};
