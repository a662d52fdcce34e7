//! Owned pixel buffers with bounds-checked access
//!
//! Pixels are premultiplied 32-bit ARGB, stored row-major from the top row
//! down. A buffer may carry row padding (`stride > width`); every accessor
//! goes through slice indexing so out-of-range reads and writes are caught
//! instead of reading a neighbouring row.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// One premultiplied ARGB pixel, `0xAARRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Argb(pub u32);

impl Argb {
    pub const TRANSPARENT: Argb = Argb(0);

    pub fn from_channels(a: u8, r: u8, g: u8, b: u8) -> Self {
        Argb(u32::from(a) << 24 | u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b))
    }

    pub fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(self) -> u8 {
        self.0 as u8
    }

    pub fn channels(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Zero alpha. Color bits are ignored.
    pub fn is_transparent(self) -> bool {
        self.0 <= 0x00ff_ffff
    }

    /// Whether any channel differs from `other` by more than `fuzz`
    pub fn differs_from(self, other: Argb, fuzz: u8) -> bool {
        self.channels()
            .iter()
            .zip(other.channels())
            .any(|(&c, o)| c.abs_diff(o) > fuzz)
    }
}

/// An opaque RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 0xff, g: 0xff, b: 0xff };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The color as a fully opaque pixel
    pub fn to_argb(self) -> Argb {
        Argb::from_channels(0xff, self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parses `RRGGBB`, optionally prefixed with `#`
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidColor(s.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| Error::InvalidColor(s.to_string()))
        };

        Ok(Color::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Integer rectangle in pixel space, half-open like [`crate::geometry::Rectangle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelRect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// A 2D grid of premultiplied ARGB pixels
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    /// Row pitch in pixels
    stride: usize,
    data: Vec<Argb>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .finish()
    }
}

impl PixelBuffer {
    /// Fully transparent buffer without padding
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, Argb::TRANSPARENT)
    }

    pub fn filled(width: usize, height: usize, pixel: Argb) -> Self {
        Self {
            width,
            height,
            stride: width,
            data: vec![pixel; width * height],
        }
    }

    /// Transparent buffer whose rows are `stride` pixels apart
    pub fn with_stride(width: usize, height: usize, stride: usize) -> Result<Self> {
        if stride < width {
            return Err(Error::MalformedAnalysisInput(format!(
                "stride {} is smaller than width {}",
                stride, width
            )));
        }

        Ok(Self {
            width,
            height,
            stride,
            data: vec![Argb::TRANSPARENT; stride * height],
        })
    }

    /// Build from native-endian 32-bit ARGB words, as produced by most
    /// rasterizers, with a row pitch of `stride_bytes`
    pub fn from_argb_bytes(width: usize, height: usize, stride_bytes: usize, bytes: &[u8]) -> Result<Self> {
        if stride_bytes % 4 != 0 {
            return Err(Error::MalformedAnalysisInput(format!(
                "stride of {} bytes is not a whole number of pixels",
                stride_bytes
            )));
        }
        if stride_bytes < width * 4 {
            return Err(Error::MalformedAnalysisInput(format!(
                "stride of {} bytes cannot hold {} pixels",
                stride_bytes, width
            )));
        }
        let required = stride_bytes * height;
        if bytes.len() < required {
            return Err(Error::MalformedAnalysisInput(format!(
                "expected {} bytes for {}x{} pixels, got {}",
                required,
                width,
                height,
                bytes.len()
            )));
        }

        let data = bytes[..required]
            .chunks_exact(4)
            .map(|word| Argb(u32::from_ne_bytes([word[0], word[1], word[2], word[3]])))
            .collect();

        Ok(Self {
            width,
            height,
            stride: stride_bytes / 4,
            data,
        })
    }

    /// Build from tightly packed straight-alpha RGBA bytes, premultiplying
    pub fn from_rgba8(width: usize, height: usize, bytes: &[u8]) -> Result<Self> {
        let required = width * height * 4;
        if bytes.len() != required {
            return Err(Error::MalformedAnalysisInput(format!(
                "expected {} RGBA bytes for {}x{} pixels, got {}",
                required,
                width,
                height,
                bytes.len()
            )));
        }

        let data = bytes
            .chunks_exact(4)
            .map(|px| {
                let a = px[3];
                let premultiply = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
                Argb::from_channels(a, premultiply(px[0]), premultiply(px[1]), premultiply(px[2]))
            })
            .collect();

        Ok(Self {
            width,
            height,
            stride: width,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row pitch in pixels
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    /// Reject buffers no analysis can run on
    pub fn ensure_analyzable(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::MalformedAnalysisInput(format!(
                "zero-sized image ({}x{})",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Argb> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.stride + x])
        } else {
            None
        }
    }

    /// Pixel at (x, y)
    ///
    /// # Panics
    ///
    /// Panics if the position lies outside the buffer.
    pub fn pixel(&self, x: usize, y: usize) -> Argb {
        self.row(y)[x]
    }

    pub fn set(&mut self, x: usize, y: usize, pixel: Argb) {
        self.row_mut(y)[x] = pixel;
    }

    /// The `width` pixels of row `y`, without padding
    pub fn row(&self, y: usize) -> &[Argb] {
        assert!(y < self.height, "row {} out of range for height {}", y, self.height);
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [Argb] {
        assert!(y < self.height, "row {} out of range for height {}", y, self.height);
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Argb]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }

    /// Apply `f` to every pixel
    pub fn map_pixels(&mut self, mut f: impl FnMut(Argb) -> Argb) {
        for y in 0..self.height {
            for px in self.row_mut(y) {
                *px = f(*px);
            }
        }
    }

    /// Copy `rect` into a new tightly packed buffer
    pub fn copy_rect(&self, rect: &PixelRect) -> PixelBuffer {
        assert!(
            rect.right() <= self.width && rect.bottom() <= self.height,
            "{:?} exceeds {}x{} buffer",
            rect,
            self.width,
            self.height
        );

        let mut data = Vec::with_capacity(rect.width * rect.height);
        for y in rect.y..rect.bottom() {
            data.extend_from_slice(&self.row(y)[rect.x..rect.right()]);
        }

        PixelBuffer {
            width: rect.width,
            height: rect.height,
            stride: rect.width,
            data,
        }
    }

    /// Paint `source` with its top-left corner at (x, y), replacing pixels
    pub fn blit(&mut self, source: &PixelBuffer, x: usize, y: usize) {
        for (dy, row) in source.rows().enumerate() {
            self.row_mut(y + dy)[x..x + source.width].copy_from_slice(row);
        }
    }

    /// Pixels as big-endian `A R G B` bytes, row by row, without padding
    pub fn to_argb_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.width * self.height * 4);
        for row in self.rows() {
            for px in row {
                bytes.extend_from_slice(&px.channels());
            }
        }
        bytes
    }

    pub fn is_fully_opaque(&self) -> bool {
        self.rows().all(|row| row.iter().all(|px| px.a() == 0xff))
    }

    /// Replace every pixel by its luminance `(min + max) / 2`, keeping alpha
    pub fn to_grayscale(&mut self) {
        self.map_pixels(|px| {
            let [a, r, g, b] = px.channels();
            let min = r.min(g).min(b);
            let max = r.max(g).max(b);
            let luminance = ((u16::from(min) + u16::from(max)) / 2) as u8;
            Argb::from_channels(a, luminance, luminance, luminance)
        });
    }

    /// Straight-alpha RGB samples and the alpha plane, as PDF images want them
    pub fn to_rgb_and_alpha(&self) -> (Vec<u8>, Vec<u8>) {
        let mut rgb = Vec::with_capacity(self.width * self.height * 3);
        let mut alpha = Vec::with_capacity(self.width * self.height);

        for row in self.rows() {
            for px in row {
                let [a, r, g, b] = px.channels();
                let unpremultiply = |c: u8| {
                    if a == 0 {
                        0
                    } else {
                        ((u16::from(c) * 255 + u16::from(a) / 2) / u16::from(a)).min(255) as u8
                    }
                };
                rgb.extend_from_slice(&[unpremultiply(r), unpremultiply(g), unpremultiply(b)]);
                alpha.push(a);
            }
        }

        (rgb, alpha)
    }
}
