//! Page layout specifications: lengths, paper sizes, margins, orientation
//!
//! These parse the textual forms accepted on the command line. Lengths are
//! numbers with an optional `pt`, `mm` or `cm` suffix; a bare number is in
//! points unless a neighbouring value supplies a unit (see
//! [`parse_paper_size`] and [`parse_margins`]).

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::geometry::{Alignment, PageSize, ScaleMode};

/// Simple length type, stored in points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from points
    pub fn from_pt(pt: f64) -> Self {
        Length(pt)
    }

    /// Create a length from millimeters
    pub fn from_mm(mm: f64) -> Self {
        Length(mm / 25.4 * 72.0)
    }

    /// Create a length from centimeters
    pub fn from_cm(cm: f64) -> Self {
        Length(cm / 2.54 * 72.0)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 72.0)
    }

    /// Get the value in points
    pub fn pt(&self) -> f64 {
        self.0
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f64 {
        self.0 / 72.0 * 25.4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Pt,
    Mm,
    Cm,
}

impl Unit {
    fn length(self, value: f64) -> Length {
        match self {
            Unit::Pt => Length::from_pt(value),
            Unit::Mm => Length::from_mm(value),
            Unit::Cm => Length::from_cm(value),
        }
    }
}

/// Split a leading decimal number off `s`
///
/// Returns the number and the rest of the string, or `None` if `s` does not
/// start with a finite number.
fn split_number(s: &str) -> Option<(f64, &str)> {
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    // exponent, only when followed by digits
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    let value: f64 = s[..end].parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some((value, &s[end..]))
}

/// Split an optional unit suffix off `s`
fn split_unit(s: &str) -> (Option<Unit>, &str) {
    let lower = s.get(..2).map(|p| p.to_ascii_lowercase());
    match lower.as_deref() {
        Some("pt") => (Some(Unit::Pt), &s[2..]),
        Some("mm") => (Some(Unit::Mm), &s[2..]),
        Some("cm") => (Some(Unit::Cm), &s[2..]),
        _ => (None, s),
    }
}

fn split_value(s: &str) -> Option<(f64, Option<Unit>, &str)> {
    let (value, rest) = split_number(s)?;
    let (unit, rest) = split_unit(rest);
    Some((value, unit, rest))
}

/// Parse a single length such as `12`, `12pt`, `5mm` or `1.5cm`; bare numbers are points
pub fn parse_length(spec: &str) -> Result<Length> {
    match split_value(spec.trim()) {
        Some((value, unit, "")) => Ok(unit.unwrap_or(Unit::Pt).length(value)),
        _ => Err(Error::General(format!("Invalid length '{}'", spec))),
    }
}

/// Parse a paper size: `A3`, `A4`, `A5` or `WIDTHxHEIGHT`
///
/// Width and height take an optional unit; a width without a unit uses the
/// height's unit, and a height without a unit is in points.
///
/// # Example
///
/// ```
/// use pdf_pagetools::layout::parse_paper_size;
///
/// let a4 = parse_paper_size("a4").unwrap();
/// assert_eq!((a4.width, a4.height), (595.0, 842.0));
///
/// let custom = parse_paper_size("100x200mm").unwrap();
/// assert!((custom.width - 283.46).abs() < 0.01);
/// ```
pub fn parse_paper_size(spec: &str) -> Result<PageSize> {
    let invalid = |reason: &str| Error::InvalidPaperSize {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    match spec.to_ascii_lowercase().as_str() {
        "a5" => return Ok(PageSize::new(420.0, 595.0)),
        "a4" => return Ok(PageSize::new(595.0, 842.0)),
        "a3" => return Ok(PageSize::new(842.0, 1190.0)),
        _ => {}
    }

    let (width, width_unit, rest) =
        split_value(spec).ok_or_else(|| invalid("invalid width"))?;

    let rest = rest
        .strip_prefix(|c: char| c == 'x' || c == 'X')
        .ok_or_else(|| invalid("expected 'x' between width and height"))?;

    let (height, height_unit, rest) =
        split_value(rest).ok_or_else(|| invalid("invalid height"))?;

    if !rest.is_empty() {
        return Err(invalid(&format!("unexpected trailing text '{}'", rest)));
    }

    let height_unit = height_unit.unwrap_or(Unit::Pt);
    let width_unit = width_unit.unwrap_or(height_unit);

    let width = width_unit.length(width).pt();
    let height = height_unit.length(height).pt();

    if width <= 0.0 {
        return Err(invalid("width must be greater than zero"));
    }
    if height <= 0.0 {
        return Err(invalid("height must be greater than zero"));
    }

    Ok(PageSize::new(width, height))
}

/// Margins for page content
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margins {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl Margins {
    /// Create margins with same value on all sides
    pub fn uniform(margin: Length) -> Self {
        Self {
            top: margin,
            right: margin,
            bottom: margin,
            left: margin,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Parse a margin specification of one to four comma-separated lengths
///
/// Values follow the CSS shorthand order:
/// `ALL`, `VERTICAL,HORIZONTAL`, `TOP,HORIZONTAL,BOTTOM` or
/// `TOP,RIGHT,BOTTOM,LEFT`. Values without a unit take the unit of the left
/// margin, which defaults to points.
pub fn parse_margins(spec: &str) -> Result<Margins> {
    let invalid = |reason: String| Error::InvalidMargin {
        spec: spec.to_string(),
        reason,
    };

    let mut values: Vec<(f64, Option<Unit>)> = Vec::with_capacity(4);
    for (i, part) in spec.split(',').enumerate() {
        if i == 4 {
            return Err(invalid("at most four values are allowed".to_string()));
        }
        let (value, unit, rest) = split_value(part.trim())
            .ok_or_else(|| invalid(format!("invalid number in value {}", i + 1)))?;
        if !rest.is_empty() {
            return Err(invalid(format!("unexpected text '{}' in value {}", rest, i + 1)));
        }
        values.push((value, unit));
    }

    let top = values[0];
    let right = values.get(1).copied().unwrap_or(top);
    let bottom = values.get(2).copied().unwrap_or(top);
    let left = values.get(3).copied().unwrap_or(right);

    let default_unit = left.1.unwrap_or(Unit::Pt);
    let resolve = |(value, unit): (f64, Option<Unit>)| unit.unwrap_or(default_unit).length(value);

    Ok(Margins {
        top: resolve(top),
        right: resolve(right),
        bottom: resolve(bottom),
        left: resolve(left),
    })
}

/// Requested page orientation for paper fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Follow the orientation of each source page
    #[default]
    Auto,
    Landscape,
    Portrait,
}

impl FromStr for Orientation {
    type Err = Error;

    /// Accepts `auto` or any prefix of `landscape` / `portrait`, ignoring case
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        if lower == "auto" {
            Ok(Orientation::Auto)
        } else if !lower.is_empty() && "landscape".starts_with(&lower) {
            Ok(Orientation::Landscape)
        } else if !lower.is_empty() && "portrait".starts_with(&lower) {
            Ok(Orientation::Portrait)
        } else {
            Err(Error::InvalidOrientation(s.to_string()))
        }
    }
}

impl Orientation {
    /// Orient `paper` for a page of size `source`. Never rotates content.
    pub fn apply(self, paper: PageSize, source: PageSize) -> PageSize {
        let swap = match self {
            Orientation::Auto => {
                (source.is_landscape() && paper.is_portrait())
                    || (source.is_portrait() && paper.is_landscape())
            }
            Orientation::Landscape => paper.is_portrait(),
            Orientation::Portrait => paper.is_landscape(),
        };

        if swap {
            paper.swapped()
        } else {
            paper
        }
    }
}

/// Parse a horizontal alignment: `left`, `center` or `right`
pub fn parse_horizontal_alignment(s: &str) -> Result<Alignment> {
    match s.to_ascii_lowercase().as_str() {
        "left" => Ok(Alignment::Start),
        "center" => Ok(Alignment::Center),
        "right" => Ok(Alignment::End),
        _ => Err(Error::InvalidAlignment(s.to_string())),
    }
}

/// Parse a vertical alignment: `top`, `center` or `bottom`
pub fn parse_vertical_alignment(s: &str) -> Result<Alignment> {
    match s.to_ascii_lowercase().as_str() {
        "top" => Ok(Alignment::Start),
        "center" => Ok(Alignment::Center),
        "bottom" => Ok(Alignment::End),
        _ => Err(Error::InvalidAlignment(s.to_string())),
    }
}

/// Parse a scale mode: `fit`, `cover` or a positive factor such as `0.5`
pub fn parse_scale_mode(s: &str) -> Result<ScaleMode> {
    match s.to_ascii_lowercase().as_str() {
        "fit" => Ok(ScaleMode::Fit),
        "cover" => Ok(ScaleMode::Cover),
        other => match other.parse::<f64>() {
            Ok(scale) if scale.is_finite() && scale > 0.0 => Ok(ScaleMode::Explicit(scale)),
            Ok(scale) => Err(Error::InvalidScale(scale)),
            Err(_) => Err(Error::General(format!("Unknown scale mode '{}'", s))),
        },
    }
}

/// Parse an offset `X,Y` such as `10,20`, `5mm,1cm` or `-3,4mm`
///
/// A bare `Y` is in points; a bare `X` takes the unit of `Y`.
pub fn parse_offset(spec: &str) -> Result<(Length, Length)> {
    let invalid = || Error::General(format!("Invalid offset '{}', expected X,Y", spec));

    let (x, y) = spec.trim().split_once(',').ok_or_else(invalid)?;
    let (x, x_unit, x_rest) = split_value(x.trim()).ok_or_else(invalid)?;
    let (y, y_unit, y_rest) = split_value(y.trim()).ok_or_else(invalid)?;
    if !x_rest.is_empty() || !y_rest.is_empty() {
        return Err(invalid());
    }

    let y_unit = y_unit.unwrap_or(Unit::Pt);
    let x_unit = x_unit.unwrap_or(y_unit);
    Ok((x_unit.length(x), y_unit.length(y)))
}

/// Parse an n-up grid `COLSxROWS` such as `2x1` or `3x2`
pub fn parse_grid(spec: &str) -> Result<(usize, usize)> {
    let invalid = || Error::General(format!("Invalid grid '{}', expected COLSxROWS", spec));

    let (cols, rows) = spec.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let cols: usize = cols.parse().map_err(|_| invalid())?;
    let rows: usize = rows.parse().map_err(|_| invalid())?;
    if cols == 0 || rows == 0 {
        return Err(invalid());
    }
    Ok((cols, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_conversions() {
        let len = Length::from_inches(1.0);
        assert!((len.mm() - 25.4).abs() < 0.01);
        assert!((len.pt() - 72.0).abs() < 0.01);
        assert!((Length::from_cm(2.54).pt() - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_named_paper_sizes() {
        assert_eq!(parse_paper_size("A4").unwrap(), PageSize::new(595.0, 842.0));
        assert_eq!(parse_paper_size("a3").unwrap(), PageSize::new(842.0, 1190.0));
        assert_eq!(parse_paper_size("A5").unwrap(), PageSize::new(420.0, 595.0));
    }

    #[test]
    fn test_custom_paper_size_units() {
        // Bare numbers are points
        assert_eq!(parse_paper_size("300x400").unwrap(), PageSize::new(300.0, 400.0));

        // Width inherits the height's unit
        let size = parse_paper_size("210x297mm").unwrap();
        assert!((size.width - 595.27).abs() < 0.01);
        assert!((size.height - 841.89).abs() < 0.01);

        // Explicit units on both sides
        let size = parse_paper_size("72ptX2.54cm").unwrap();
        assert!((size.width - 72.0).abs() < 1e-9);
        assert!((size.height - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_paper_sizes() {
        for spec in ["", "a6", "100", "100x", "x100", "100x200px", "0x100", "100x-5"] {
            let result = parse_paper_size(spec);
            assert!(
                matches!(result, Err(Error::InvalidPaperSize { .. })),
                "'{}' should be rejected",
                spec
            );
        }
    }

    #[test]
    fn test_margin_shorthand() {
        let m = parse_margins("10").unwrap();
        assert_eq!(m, Margins::uniform(Length::from_pt(10.0)));

        let m = parse_margins("10,20").unwrap();
        assert_eq!(m.top.pt(), 10.0);
        assert_eq!(m.right.pt(), 20.0);
        assert_eq!(m.bottom.pt(), 10.0);
        assert_eq!(m.left.pt(), 20.0);

        let m = parse_margins("1,2,3").unwrap();
        assert_eq!((m.top.pt(), m.right.pt(), m.bottom.pt(), m.left.pt()), (1.0, 2.0, 3.0, 2.0));

        let m = parse_margins("1,2,3,4").unwrap();
        assert_eq!((m.top.pt(), m.right.pt(), m.bottom.pt(), m.left.pt()), (1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_margin_units_follow_left_margin() {
        let m = parse_margins("10,20mm").unwrap();
        // left inherits 20mm, so the unitless top is in mm too
        assert!((m.top.mm() - 10.0).abs() < 1e-9);
        assert!((m.left.mm() - 20.0).abs() < 1e-9);

        let m = parse_margins("1cm,5").unwrap();
        assert!((m.top.mm() - 10.0).abs() < 1e-9);
        assert_eq!(m.right.pt(), 5.0);
    }

    #[test]
    fn test_invalid_margins() {
        for spec in ["", "a", "1,2,3,4,5", "1;2", "1,,2", "3px"] {
            assert!(
                matches!(parse_margins(spec), Err(Error::InvalidMargin { .. })),
                "'{}' should be rejected",
                spec
            );
        }
    }

    #[test]
    fn test_orientation_parsing() {
        assert_eq!("auto".parse::<Orientation>().unwrap(), Orientation::Auto);
        assert_eq!("Land".parse::<Orientation>().unwrap(), Orientation::Landscape);
        assert_eq!("p".parse::<Orientation>().unwrap(), Orientation::Portrait);
        assert!("sideways".parse::<Orientation>().is_err());
        assert!("".parse::<Orientation>().is_err());
    }

    #[test]
    fn test_orientation_apply() {
        let a4 = PageSize::new(595.0, 842.0);
        let wide = PageSize::new(800.0, 600.0);
        let tall = PageSize::new(600.0, 800.0);

        assert_eq!(Orientation::Auto.apply(a4, wide), a4.swapped());
        assert_eq!(Orientation::Auto.apply(a4, tall), a4);
        assert_eq!(Orientation::Landscape.apply(a4, tall), a4.swapped());
        assert_eq!(Orientation::Portrait.apply(a4.swapped(), wide), a4);
    }

    #[test]
    fn test_alignment_names() {
        assert_eq!(parse_horizontal_alignment("LEFT").unwrap(), Alignment::Start);
        assert_eq!(parse_horizontal_alignment("right").unwrap(), Alignment::End);
        assert_eq!(parse_vertical_alignment("top").unwrap(), Alignment::Start);
        assert_eq!(parse_vertical_alignment("center").unwrap(), Alignment::Center);
        assert!(parse_horizontal_alignment("top").is_err());
        assert!(parse_vertical_alignment("left").is_err());
    }

    #[test]
    fn test_scale_modes() {
        assert_eq!(parse_scale_mode("fit").unwrap(), ScaleMode::Fit);
        assert_eq!(parse_scale_mode("Cover").unwrap(), ScaleMode::Cover);
        assert_eq!(parse_scale_mode("0.5").unwrap(), ScaleMode::Explicit(0.5));
        assert!(matches!(parse_scale_mode("0"), Err(Error::InvalidScale(_))));
        assert!(matches!(parse_scale_mode("-2"), Err(Error::InvalidScale(_))));
        assert!(parse_scale_mode("stretch").is_err());
    }

    #[test]
    fn test_single_lengths() {
        assert_eq!(parse_length("36").unwrap(), Length::from_pt(36.0));
        assert_eq!(parse_length("10mm").unwrap(), Length::from_mm(10.0));
        assert_eq!(parse_length(" 2cm ").unwrap(), Length::from_cm(2.0));
        assert!(parse_length("10in").is_err());
        assert!(parse_length("").is_err());
    }

    #[test]
    fn test_offsets() {
        assert_eq!(parse_offset("10,20").unwrap(), (Length::from_pt(10.0), Length::from_pt(20.0)));
        assert_eq!(parse_offset("-5,1cm").unwrap(), (Length::from_cm(-5.0), Length::from_cm(1.0)));
        assert_eq!(parse_offset("5mm,3").unwrap(), (Length::from_mm(5.0), Length::from_pt(3.0)));

        for spec in ["", "10", "10,", ",10", "10;20", "10,20,30", "1in,2"] {
            assert!(parse_offset(spec).is_err(), "{:?} accepted", spec);
        }
    }

    #[test]
    fn test_grids() {
        assert_eq!(parse_grid("3x2").unwrap(), (3, 2));
        assert_eq!(parse_grid("1X4").unwrap(), (1, 4));

        for spec in ["", "3", "0x2", "2x0", "x2", "2x", "-1x2", "1.5x2"] {
            assert!(parse_grid(spec).is_err(), "{:?} accepted", spec);
        }
    }
}
