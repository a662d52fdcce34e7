//! Chopping a rasterized page into opaque rectangular regions
//!
//! A page rendered at high resolution is mostly empty paper. Instead of
//! embedding the whole bitmap, [`decompose`] splits its non-transparent
//! pixels into rectangles that can be embedded as separate images. Each region
//! carries a SHA-256 [`ContentHash`] of its pixels, so a writer can embed
//! repeated content (glyph-like raster shapes are common) only once.
//!
//! The input must already be alpha-matted so the paper is transparent; see
//! [`matte_white`].

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::raster::buffer::{Argb, PixelBuffer, PixelRect};

/// Color burnt into region borders when debug outlines are enabled
const OUTLINE: Argb = Argb(0xffff_0000);

/// SHA-256 digest of a pixel buffer's dimensions and pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash the visible pixels of `buffer`; row padding does not contribute
    pub fn of(buffer: &PixelBuffer) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((buffer.width() as u32).to_le_bytes());
        hasher.update((buffer.height() as u32).to_le_bytes());
        for row in buffer.rows() {
            for px in row {
                hasher.update(px.channels());
            }
        }
        ContentHash(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// An irreducible opaque block found by the decomposer
#[derive(Debug, Clone)]
pub struct EmittedRegion {
    /// Position in the source image, in pixels
    pub rect: PixelRect,
    /// Copy of the source pixels inside `rect`
    pub pixels: PixelBuffer,
    pub content_hash: ContentHash,
}

/// Settings for [`decompose`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecomposeOptions {
    /// Burn a one pixel red outline into every emitted region
    pub debug_outlines: bool,
    /// Fail once more than this many regions would be emitted
    pub region_limit: Option<usize>,
}

/// Make white paper transparent
///
/// Subtracts `min(r, g, b)` from every channel including alpha, which turns
/// white into full transparency and fades light colors proportionally. Expects
/// an opaque image.
pub fn matte_white(image: &mut PixelBuffer) {
    image.map_pixels(|px| {
        let [a, r, g, b] = px.channels();
        let whiteness = r.min(g).min(b);
        Argb::from_channels(
            a.saturating_sub(whiteness),
            r - whiteness,
            g - whiteness,
            b - whiteness,
        )
    });
}

/// Working rectangle, as half-open edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Area {
    top: usize,
    right: usize,
    bottom: usize,
    left: usize,
}

impl Area {
    fn width(&self) -> usize {
        self.right - self.left
    }

    fn height(&self) -> usize {
        self.bottom - self.top
    }

    fn to_rect(self) -> PixelRect {
        PixelRect::new(self.left, self.top, self.width(), self.height())
    }
}

enum Step {
    Empty,
    /// Process the first area completely, then the second
    Split(Area, Area),
    /// A corner followed by the two halves of the L-shape around it
    Chop(Area, [Area; 2]),
    Emit(EmittedRegion),
}

/// Lazily decomposes an image, yielding regions depth-first
///
/// Recursion is kept on an explicit stack, so deeply nested splits do not
/// grow the call stack. Pending areas never overlap, and every area pushed
/// is strictly smaller than the one it came from.
pub struct Regions {
    image: PixelBuffer,
    pending: Vec<Area>,
    debug_outlines: bool,
}

impl Regions {
    pub fn new(image: PixelBuffer, debug_outlines: bool) -> Self {
        let whole = Area {
            top: 0,
            right: image.width(),
            bottom: image.height(),
            left: 0,
        };
        Self {
            image,
            pending: vec![whole],
            debug_outlines,
        }
    }

    fn opaque(&self, x: usize, y: usize) -> bool {
        !self.image.pixel(x, y).is_transparent()
    }

    /// Transparent pixels in row `y` counted from `left` towards `right`
    fn run_from_left(&self, y: usize, left: usize, right: usize) -> usize {
        (left..right).position(|x| self.opaque(x, y)).unwrap_or(right - left)
    }

    fn run_from_right(&self, y: usize, left: usize, right: usize) -> usize {
        (left..right).rev().position(|x| self.opaque(x, y)).unwrap_or(right - left)
    }

    fn run_from_top(&self, x: usize, top: usize, bottom: usize) -> usize {
        (top..bottom).position(|y| self.opaque(x, y)).unwrap_or(bottom - top)
    }

    fn run_from_bottom(&self, x: usize, top: usize, bottom: usize) -> usize {
        (top..bottom).rev().position(|y| self.opaque(x, y)).unwrap_or(bottom - top)
    }

    fn row_clear(&self, y: usize, area: &Area) -> bool {
        self.run_from_left(y, area.left, area.right) == area.width()
    }

    fn column_clear(&self, x: usize, area: &Area) -> bool {
        self.run_from_top(x, area.top, area.bottom) == area.height()
    }

    /// Trim transparent rows and columns off the edges
    fn shrink(&self, mut area: Area) -> Option<Area> {
        while area.top < area.bottom && self.row_clear(area.top, &area) {
            area.top += 1;
        }
        if area.top == area.bottom {
            return None;
        }
        while area.top < area.bottom && self.row_clear(area.bottom - 1, &area) {
            area.bottom -= 1;
        }
        while area.left < area.right && self.column_clear(area.left, &area) {
            area.left += 1;
        }
        while area.left < area.right && self.column_clear(area.right - 1, &area) {
            area.right -= 1;
        }
        if area.left == area.right {
            return None;
        }
        Some(area)
    }

    /// Cut off a staircase-shaped corner
    ///
    /// Looks for a column whose transparent run (from the top or bottom) is
    /// longer than a neighbour's, then for a row next to that step whose
    /// transparent run reaches the column. The block enclosed by that row and
    /// column is the corner. It always contains an opaque pixel.
    ///
    /// Returns the corner and the rest of `area` as two disjoint areas.
    fn find_corner(&self, area: &Area) -> Option<(Area, [Area; 2])> {
        let Area { top, right, bottom, left } = *area;

        let tops: Vec<usize> = (left..right).map(|x| self.run_from_top(x, top, bottom)).collect();
        let bottoms: Vec<usize> = (left..right).map(|x| self.run_from_bottom(x, top, bottom)).collect();
        let lefts: Vec<usize> = (top..bottom).map(|y| self.run_from_left(y, left, right)).collect();
        let rights: Vec<usize> = (top..bottom).map(|y| self.run_from_right(y, left, right)).collect();

        let inner_columns = (left + 1)..right.saturating_sub(1);

        // top left and top right
        for x in inner_columns.clone() {
            let i = x - left;
            let (b_self, b_left, b_right) = (tops[i], tops[i - 1], tops[i + 1]);

            if b_self > b_left {
                for y in (top + b_left..top + b_self).rev() {
                    if lefts[y - top] >= x - left {
                        return Some((
                            Area { top, right: x, bottom: y, left },
                            [Area { bottom: y, left: x, ..*area }, Area { top: y, ..*area }],
                        ));
                    }
                }
            }
            if b_self > b_right {
                for y in (top + b_right..top + b_self).rev() {
                    if rights[y - top] >= right - x {
                        return Some((
                            Area { top, right, bottom: y, left: x },
                            [Area { bottom: y, right: x, ..*area }, Area { top: y, ..*area }],
                        ));
                    }
                }
            }
        }

        // bottom left and bottom right
        for x in inner_columns {
            let i = x - left;
            let (b_self, b_left, b_right) = (bottoms[i], bottoms[i - 1], bottoms[i + 1]);

            if b_self > b_left {
                for y in bottom - b_self - 1..bottom - b_left {
                    if lefts[y - top] >= x - left {
                        return Some((
                            Area { top: y, right: x, bottom, left },
                            [Area { bottom: y, ..*area }, Area { top: y, left: x, ..*area }],
                        ));
                    }
                }
            }
            if b_self > b_right {
                for y in bottom - b_self - 1..bottom - b_right {
                    if rights[y - top] >= right - x {
                        return Some((
                            Area { top: y, right, bottom, left: x },
                            [Area { bottom: y, ..*area }, Area { top: y, right: x, ..*area }],
                        ));
                    }
                }
            }
        }

        None
    }

    fn emit(&self, area: Area) -> EmittedRegion {
        let rect = area.to_rect();
        let mut pixels = self.image.copy_rect(&rect);

        if self.debug_outlines {
            draw_outline(&mut pixels);
        }

        let content_hash = ContentHash::of(&pixels);

        EmittedRegion {
            rect,
            pixels,
            content_hash,
        }
    }

    fn step(&self, area: Area) -> Step {
        let Some(area) = self.shrink(area) else {
            return Step::Empty;
        };

        // split horizontally
        for y in area.top..area.bottom {
            if self.row_clear(y, &area) {
                return Step::Split(Area { bottom: y, ..area }, Area { top: y, ..area });
            }
        }

        // split vertically
        for x in area.left..area.right {
            if self.column_clear(x, &area) {
                return Step::Split(Area { right: x, ..area }, Area { left: x, ..area });
            }
        }

        if let Some((corner, rest)) = self.find_corner(&area) {
            return Step::Chop(corner, rest);
        }

        Step::Emit(self.emit(area))
    }
}

impl Iterator for Regions {
    type Item = EmittedRegion;

    fn next(&mut self) -> Option<EmittedRegion> {
        while let Some(area) = self.pending.pop() {
            match self.step(area) {
                Step::Empty => {}
                Step::Split(first, second) => {
                    self.pending.push(second);
                    self.pending.push(first);
                }
                Step::Chop(corner, [first, second]) => {
                    self.pending.push(second);
                    self.pending.push(first);
                    self.pending.push(corner);
                }
                Step::Emit(region) => return Some(region),
            }
        }
        None
    }
}

fn draw_outline(pixels: &mut PixelBuffer) {
    let (width, height) = (pixels.width(), pixels.height());
    for x in 0..width {
        pixels.set(x, 0, OUTLINE);
        pixels.set(x, height - 1, OUTLINE);
    }
    for y in 0..height {
        pixels.set(0, y, OUTLINE);
        pixels.set(width - 1, y, OUTLINE);
    }
}

/// Split the non-transparent pixels of `image` into rectangular regions
///
/// Every opaque input pixel ends up in exactly one region, at the same
/// position and with the same value (unless debug outlines paint over it).
/// No two region rectangles overlap. Regions are produced depth-first:
/// areas split off first are finished first.
///
/// # Example
///
/// ```
/// use pdf_pagetools::raster::{decompose, Argb, DecomposeOptions, PixelBuffer, PixelRect};
///
/// let mut image = PixelBuffer::new(10, 10);
/// image.set(2, 3, Argb(0xff00_0000));
///
/// let regions = decompose(image, &DecomposeOptions::default()).unwrap();
/// assert_eq!(regions.len(), 1);
/// assert_eq!(regions[0].rect, PixelRect::new(2, 3, 1, 1));
/// ```
pub fn decompose(image: PixelBuffer, options: &DecomposeOptions) -> Result<Vec<EmittedRegion>> {
    image.ensure_analyzable()?;

    let mut regions = Vec::new();
    for region in Regions::new(image, options.debug_outlines) {
        if let Some(limit) = options.region_limit {
            if regions.len() == limit {
                return Err(Error::DecompositionLimit(limit));
            }
        }
        regions.push(region);
    }

    Ok(regions)
}
