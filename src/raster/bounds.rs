//! Content bounds detection for whitespace cropping
//!
//! A page is rendered onto its background color and scanned from each edge
//! inwards. Lines (rows or columns) that are close enough to the background
//! count as margin; the first line with too many differing pixels stops the
//! scan for that side.

use std::str::FromStr;

use log::debug;

use crate::error::{Error, Result};
use crate::geometry::{PageSize, Rectangle};
use crate::layout::Margins;
use crate::raster::buffer::{Argb, Color, PixelBuffer, PixelRect};

/// Tuning for [`detect_bounds`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionParams {
    /// Color the page was rendered onto
    pub background: Color,
    /// Largest per-channel difference still counted as background
    pub fuzz: u8,
    /// Differing pixels a line may contain and still count as margin
    pub mismatch_budget: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            fuzz: 0,
            mismatch_budget: 0,
        }
    }
}

/// Margins in whole pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelMargins {
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
    pub left: usize,
}

impl PixelMargins {
    /// The content rectangle these margins leave in a `width` x `height` image
    pub fn content_rect(&self, width: usize, height: usize) -> PixelRect {
        PixelRect::new(
            self.left,
            self.top,
            width.saturating_sub(self.left + self.right),
            height.saturating_sub(self.top + self.bottom),
        )
    }
}

/// Whitespace to remove on each side, in page-space units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundsResult {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl BoundsResult {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Zero the margins of every side in `sides`, so those sides are not cropped
    pub fn without_sides(&self, sides: Sides) -> Self {
        Self {
            top: if sides.top { 0.0 } else { self.top },
            right: if sides.right { 0.0 } else { self.right },
            bottom: if sides.bottom { 0.0 } else { self.bottom },
            left: if sides.left { 0.0 } else { self.left },
        }
    }

    /// Leave `extra` of the detected whitespace in place, never going below zero
    pub fn shrink_by(&self, extra: &Margins) -> Self {
        Self {
            top: (self.top - extra.top.pt()).max(0.0),
            right: (self.right - extra.right.pt()).max(0.0),
            bottom: (self.bottom - extra.bottom.pt()).max(0.0),
            left: (self.left - extra.left.pt()).max(0.0),
        }
    }

    /// The part of a page of size `page` that remains after cropping
    pub fn content_rect(&self, page: PageSize) -> Rectangle {
        Rectangle::new(
            self.left,
            self.top,
            page.width - self.left - self.right,
            page.height - self.top - self.bottom,
        )
    }
}

/// A subset of the four page sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sides {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Sides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            top: true,
            right: true,
            bottom: true,
            left: true,
        }
    }
}

impl FromStr for Sides {
    type Err = Error;

    /// Comma-separated side names: `top`, `right`, `bottom`, `left`, or `all`
    fn from_str(s: &str) -> Result<Self> {
        let mut sides = Sides::none();
        for name in s.split(',').map(str::trim) {
            match name.to_ascii_lowercase().as_str() {
                "top" => sides.top = true,
                "right" => sides.right = true,
                "bottom" => sides.bottom = true,
                "left" => sides.left = true,
                "all" => sides = Sides::all(),
                _ => return Err(Error::General(format!("Unknown page side '{}'", name))),
            }
        }
        Ok(sides)
    }
}

/// Whether a line holds more than `budget` pixels that differ from `background`
fn line_blocked(pixels: impl Iterator<Item = Argb>, background: Argb, fuzz: u8, budget: usize) -> bool {
    let mut mismatches = 0;
    for px in pixels {
        if px.differs_from(background, fuzz) {
            mismatches += 1;
            if mismatches > budget {
                return true;
            }
        }
    }
    false
}

/// Detect the whitespace margins of `image` in pixels
///
/// Sides are scanned in the order top, bottom, left, right. The bottom scan
/// never passes the top boundary, and the column scans only look at the rows
/// between the top and bottom boundaries, so the margins never overlap.
///
/// Returns `None` when every row counts as background (a blank page).
pub fn detect_pixel_margins(image: &PixelBuffer, params: &DetectionParams) -> Result<Option<PixelMargins>> {
    image.ensure_analyzable()?;

    let width = image.width();
    let height = image.height();
    let background = params.background.to_argb();
    let fuzz = params.fuzz;
    let budget = params.mismatch_budget;

    let row_blocked = |y: usize| line_blocked(image.row(y).iter().copied(), background, fuzz, budget);

    let mut top = 0;
    while top < height && !row_blocked(top) {
        top += 1;
    }
    if top == height {
        return Ok(None);
    }

    let mut bottom = 0;
    while bottom < height - top && !row_blocked(height - 1 - bottom) {
        bottom += 1;
    }

    let rows = top..height - bottom;
    let column_blocked = |x: usize| {
        line_blocked(rows.clone().map(|y| image.pixel(x, y)), background, fuzz, budget)
    };

    let mut left = 0;
    while left < width && !column_blocked(left) {
        left += 1;
    }

    let mut right = 0;
    if left == width {
        // Every column stayed within budget even though some rows did not:
        // the content is spread too thinly to crop horizontally.
        left = 0;
    } else {
        while right < width - left && !column_blocked(width - 1 - right) {
            right += 1;
        }
    }

    Ok(Some(PixelMargins {
        top,
        right,
        bottom,
        left,
    }))
}

/// Detect the whitespace margins of a page rendered into `image`
///
/// `page` is the page size in page-space units; pixel margins are converted
/// with `page / image` per axis. A blank page yields zero margins, so it is
/// left untouched rather than cropped away.
pub fn detect_bounds(image: &PixelBuffer, page: PageSize, params: &DetectionParams) -> Result<BoundsResult> {
    let Some(margins) = detect_pixel_margins(image, params)? else {
        debug!("Blank {}x{} image, not cropping", image.width(), image.height());
        return Ok(BoundsResult::zero());
    };

    let x_scale = page.width / image.width() as f64;
    let y_scale = page.height / image.height() as f64;

    debug!(
        "Pixel margins top={} right={} bottom={} left={} in {}x{} image",
        margins.top,
        margins.right,
        margins.bottom,
        margins.left,
        image.width(),
        image.height()
    );

    Ok(BoundsResult {
        top: margins.top as f64 * y_scale,
        right: margins.right as f64 * x_scale,
        bottom: margins.bottom as f64 * y_scale,
        left: margins.left as f64 * x_scale,
    })
}

/// Margins that are safe to apply to every page of a document
///
/// Takes the smallest margin seen on each side, so no page loses content.
/// Returns `None` for an empty slice.
pub fn aggregate_bounds(per_page: &[BoundsResult]) -> Option<BoundsResult> {
    let (first, rest) = per_page.split_first()?;

    Some(rest.iter().fold(*first, |acc, b| BoundsResult {
        top: acc.top.min(b.top),
        right: acc.right.min(b.right),
        bottom: acc.bottom.min(b.bottom),
        left: acc.left.min(b.left),
    }))
}
