//! Pixel-level analysis of rendered pages

pub mod bounds;
pub mod buffer;
pub mod chop;

pub use bounds::{aggregate_bounds, detect_bounds, detect_pixel_margins, BoundsResult, DetectionParams, PixelMargins, Sides};
pub use buffer::{Argb, Color, PixelBuffer, PixelRect};
pub use chop::{decompose, matte_white, ContentHash, DecomposeOptions, EmittedRegion, Regions};
