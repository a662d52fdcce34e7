//! Page geometry: rectangles, affine transforms and fit placement
//!
//! All coordinates here are page space with the origin at the top-left corner
//! and y growing downwards. Rectangles are half-open: a rectangle covers
//! `[x, x + width) × [y, y + height)`, so `x + width` is the first coordinate
//! outside it. For continuous page-space rectangles that exclusive edge is
//! also the geometric edge, which is why [`compute_bounding_rect`] transforms
//! the corners as-is. Conversion to PDF user space (bottom-left origin) only
//! happens in the page writer.

use crate::error::{Error, Result};

/// Tolerance used when comparing transform coefficients
const EPSILON: f64 = 1e-9;

/// Axis-aligned rectangle in page-space units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle anchored at the origin
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Exclusive right edge
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Fails with [`Error::DegenerateRectangle`] unless both sides are positive
    pub fn ensure_non_degenerate(&self) -> Result<()> {
        // NaN fails both comparisons, so it is rejected as well
        if self.width > 0.0 && self.height > 0.0 {
            Ok(())
        } else {
            Err(Error::DegenerateRectangle {
                width: self.width,
                height: self.height,
            })
        }
    }

    /// The four corners: top-left, bottom-left, top-right, bottom-right
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.x, self.y),
            (self.x, self.bottom()),
            (self.right(), self.y),
            (self.right(), self.bottom()),
        ]
    }

    /// Approximate equality, used when comparing computed geometry
    pub fn approx_eq(&self, other: &Rectangle, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// Page dimensions in page-space units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn to_rect(self) -> Rectangle {
        Rectangle::from_size(self.width, self.height)
    }

    /// Same size with width and height exchanged
    pub fn swapped(self) -> Self {
        Self::new(self.height, self.width)
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    pub fn is_portrait(&self) -> bool {
        self.width < self.height
    }
}

/// Represents a 2D affine transformation matrix [a b c d e f]
/// where: x' = a*x + c*y + e, y' = b*x + d*y + f
///
/// This is the same layout as the PDF `cm` operator, so a transform can be
/// written into a content stream without reordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Identity matrix (no transformation)
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `radians`. With y pointing down, a positive angle turns
    /// clockwise on screen.
    pub fn rotate(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Transform that applies `self` first and `next` afterwards
    pub fn then(&self, next: &AffineTransform) -> Self {
        Self {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            e: next.a * self.e + next.c * self.f + next.e,
            f: next.b * self.e + next.d * self.f + next.f,
        }
    }

    /// Translate coordinates by (tx, ty) before applying this transform
    pub fn pre_translate(&self, tx: f64, ty: f64) -> Self {
        Self::translate(tx, ty).then(self)
    }

    /// Scale coordinates by (sx, sy) before applying this transform
    pub fn pre_scale(&self, sx: f64, sy: f64) -> Self {
        Self::scale(sx, sy).then(self)
    }

    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Calculate the inverse of this transformation matrix
    ///
    /// Returns `None` for a singular matrix.
    pub fn inverse(&self) -> Option<Self> {
        // | a  c  e |
        // | b  d  f |
        // | 0  0  1 |
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < EPSILON {
            return None;
        }

        Some(Self {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    /// Check if this is (approximately) the identity matrix
    pub fn is_identity(&self) -> bool {
        self.approx_eq(&Self::identity(), 1e-6)
    }

    pub fn approx_eq(&self, other: &AffineTransform, tolerance: f64) -> bool {
        (self.a - other.a).abs() <= tolerance
            && (self.b - other.b).abs() <= tolerance
            && (self.c - other.c).abs() <= tolerance
            && (self.d - other.d).abs() <= tolerance
            && (self.e - other.e).abs() <= tolerance
            && (self.f - other.f).abs() <= tolerance
    }

    /// Coefficients in `cm` operand order
    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

/// Placement of the scaled source along one axis of the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Left or top edge
    Start,
    #[default]
    Center,
    /// Right or bottom edge
    End,
}

impl Alignment {
    /// Offset of a span of `scaled` inside a span of `available`
    fn offset(self, available: f64, scaled: f64) -> f64 {
        match self {
            Alignment::Start => 0.0,
            Alignment::Center => (available - scaled) / 2.0,
            Alignment::End => available - scaled,
        }
    }
}

/// How the scale factor of a fit placement is chosen
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ScaleMode {
    /// Largest scale at which the source fits entirely inside the destination
    #[default]
    Fit,
    /// Smallest scale at which the source covers the destination entirely
    Cover,
    /// Caller-supplied factor
    Explicit(f64),
}

impl ScaleMode {
    /// Resolve to a numeric factor for placing `source` into `dest`
    pub fn resolve(self, source: &Rectangle, dest: &Rectangle) -> Result<f64> {
        let scale_x = dest.width / source.width;
        let scale_y = dest.height / source.height;

        match self {
            ScaleMode::Fit => Ok(scale_x.min(scale_y)),
            ScaleMode::Cover => Ok(scale_x.max(scale_y)),
            ScaleMode::Explicit(scale) if scale.is_finite() && scale > 0.0 => Ok(scale),
            ScaleMode::Explicit(scale) => Err(Error::InvalidScale(scale)),
        }
    }
}

/// Build the transform that places `source` into `dest`
///
/// The source is scaled uniformly according to `scale_mode` and aligned
/// independently on each axis. The source rectangle's own origin is anchored
/// first, so the transformed source occupies exactly
/// `(dest.x + tx, dest.y + ty, source.width * scale, source.height * scale)`.
///
/// # Example
///
/// ```
/// use pdf_pagetools::geometry::{build_fit_transform, Alignment, Rectangle, ScaleMode};
///
/// let source = Rectangle::new(0.0, 0.0, 100.0, 50.0);
/// let dest = Rectangle::new(0.0, 0.0, 200.0, 200.0);
/// let m = build_fit_transform(&source, &dest, Alignment::Center, Alignment::Start, ScaleMode::Fit)
///     .unwrap();
///
/// assert_eq!(m.transform_point(0.0, 0.0), (0.0, 0.0));
/// assert_eq!(m.transform_point(100.0, 50.0), (200.0, 100.0));
/// ```
pub fn build_fit_transform(
    source: &Rectangle,
    dest: &Rectangle,
    halign: Alignment,
    valign: Alignment,
    scale_mode: ScaleMode,
) -> Result<AffineTransform> {
    source.ensure_non_degenerate()?;
    dest.ensure_non_degenerate()?;

    let scale = scale_mode.resolve(source, dest)?;

    let scaled_width = source.width * scale;
    let scaled_height = source.height * scale;

    let tx = halign.offset(dest.width, scaled_width);
    let ty = valign.offset(dest.height, scaled_height);

    Ok(AffineTransform::identity()
        .pre_translate(dest.x + tx, dest.y + ty)
        .pre_scale(scale, scale)
        .pre_translate(-source.x, -source.y))
}

/// Axis-aligned bounding box of `source` after `transform`
///
/// Used to size an output page after rotating its content so nothing is
/// clipped.
pub fn compute_bounding_rect(source: &Rectangle, transform: &AffineTransform) -> Rectangle {
    let points = source.corners().map(|(x, y)| transform.transform_point(x, y));

    let mut left = f64::INFINITY;
    let mut top = f64::INFINITY;
    let mut right = f64::NEG_INFINITY;
    let mut bottom = f64::NEG_INFINITY;

    for (x, y) in points {
        left = left.min(x);
        top = top.min(y);
        right = right.max(x);
        bottom = bottom.max(y);
    }

    Rectangle::new(left, top, right - left, bottom - top)
}
