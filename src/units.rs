//! Parsing of user-facing job parameters: print lengths, bounds and formats.

use crate::encode::ImageFormat;
use crate::foundation::core::{BoundingBox, LngLat};
use crate::foundation::error::{MapError, MapResult};

/// CSS pixels (points) per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Device pixels per CSS pixel for a print resolution.
pub fn pixel_ratio_for_dpi(dpi: f64) -> MapResult<f64> {
    if !dpi.is_finite() || dpi <= 0.0 {
        return Err(MapError::configuration(format!(
            "dpi must be positive (got {dpi})"
        )));
    }
    Ok(dpi / POINTS_PER_INCH)
}

/// Convert a length like `11in`, `20cm` or `1600` to device pixels.
///
/// Unitless values and `px` are already device pixels. Physical lengths become
/// `ceil(inches * 72) * pixel_ratio`, rounded up.
pub fn parse_length_to_pixels(input: &str, pixel_ratio: f64) -> MapResult<u32> {
    let s = input.trim();
    let split = s
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    let (num, unit) = s.split_at(split);
    let value: f64 = num
        .trim()
        .parse()
        .map_err(|_| MapError::configuration(format!("invalid length '{input}'")))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(MapError::configuration(format!(
            "length must be positive (got '{input}')"
        )));
    }

    let inches = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "px" => return to_pixels(value.ceil(), input),
        "in" | "inch" | "inches" => value,
        "cm" => value / 2.54,
        "mm" => value / 25.4,
        "pt" => value / POINTS_PER_INCH,
        other => {
            return Err(MapError::configuration(format!(
                "unsupported length unit '{other}' in '{input}'"
            )));
        }
    };
    to_pixels(((inches * POINTS_PER_INCH).ceil() * pixel_ratio).ceil(), input)
}

fn to_pixels(px: f64, input: &str) -> MapResult<u32> {
    if !(1.0..=f64::from(u32::MAX)).contains(&px) {
        return Err(MapError::configuration(format!(
            "length '{input}' is out of range"
        )));
    }
    Ok(px as u32)
}

/// Parse `west,south,east,north` in degrees.
pub fn parse_bounds(input: &str) -> MapResult<BoundingBox> {
    let parts = input
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| MapError::configuration(format!("invalid bounding box '{input}'")))?;
    let &[w, s, e, n] = parts.as_slice() else {
        return Err(MapError::configuration(format!(
            "bounding box needs 4 values west,south,east,north (got '{input}')"
        )));
    };
    BoundingBox::new(LngLat::new(w, s), LngLat::new(e, n))
}

/// Map a format name or MIME type to an [`ImageFormat`]; unknown names fall back to PNG.
pub fn parse_format(input: &str) -> ImageFormat {
    match input.trim().to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "image/jpg" | "image/jpeg" => ImageFormat::Jpeg,
        "webp" | "image/webp" => ImageFormat::Webp,
        _ => ImageFormat::Png,
    }
}
