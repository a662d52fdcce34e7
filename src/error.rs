//! Error types for the PDF page tools library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF page tools library
#[derive(Error, Debug)]
pub enum Error {
    /// A transform source or destination has a non-positive side
    #[error("Degenerate rectangle: {width} x {height}")]
    DegenerateRectangle { width: f64, height: f64 },

    /// Explicit scale factor that is not a positive finite number
    #[error("Invalid scale factor: {0}")]
    InvalidScale(f64),

    /// Pixel buffer that cannot be analysed (zero-sized, bad stride, short data)
    #[error("Malformed analysis input: {0}")]
    MalformedAnalysisInput(String),

    /// The rasterizer or page writer reported a failure
    #[error("Render backend failure: {0}")]
    RenderBackend(String),

    /// The decomposer produced more regions than allowed
    #[error("Region decomposition exceeded the limit of {0} regions")]
    DecompositionLimit(usize),

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Paper size specification could not be parsed
    #[error("Invalid paper size '{spec}': {reason}")]
    InvalidPaperSize { spec: String, reason: String },

    /// Margin specification could not be parsed
    #[error("Invalid margin specification '{spec}': {reason}")]
    InvalidMargin { spec: String, reason: String },

    /// Color specification could not be parsed
    #[error("Not a valid color: {0}")]
    InvalidColor(String),

    /// Unknown alignment name
    #[error("Invalid alignment '{0}'")]
    InvalidAlignment(String),

    /// Unknown orientation name
    #[error("Invalid orientation '{0}'")]
    InvalidOrientation(String),

    /// General error
    #[error("{0}")]
    General(String),
}
