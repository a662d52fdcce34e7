//! PDF Page Tools Library
//!
//! Geometry and raster analysis for page-level PDF transformations.
//! This library provides functionality to:
//! - Crop whitespace, detected on rendered pages
//! - Fit pages onto a paper size with margins and alignment
//! - Rotate pages by arbitrary angles
//! - Arrange several pages per sheet (n-up) and stack pages of other PDFs on top
//! - Rasterize pages, optionally chopped into deduplicated opaque regions
//!
//! # Example
//!
//! ```no_run
//! use pdf_pagetools::pdf::{pagefit_pdf, PagefitOptions};
//! use pdf_pagetools::layout::parse_paper_size;
//! use std::path::Path;
//!
//! let options = PagefitOptions {
//!     paper: parse_paper_size("A5").unwrap(),
//!     ..Default::default()
//! };
//!
//! pagefit_pdf(Path::new("slides.pdf"), Path::new("a5.pdf"), &options).expect("Failed to fit pages");
//! ```

pub mod error;
pub mod geometry;
pub mod layout;
pub mod pdf;
pub mod raster;

// Re-export commonly used items
pub use error::{Error, Result};
