//! Length unit conversion into the shared pixel space.
//!
//! Every bounding box in the model is expressed in pixels at [`LAYOUT_DPI`].
//! Conversions truncate toward zero so that intersection tests downstream see
//! the same integer edges on every run.

/// Resolution of the common pixel space.
pub const LAYOUT_DPI: f32 = 96.0;

/// English Metric Units per pixel at 96 DPI (914400 EMU per inch / 96).
pub const EMU_PER_PIXEL: i64 = 9525;

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Convert EMU to pixels, truncating toward zero.
pub fn emu_to_pixels(emu: i64) -> i32 {
    (emu / EMU_PER_PIXEL) as i32
}

/// Convert PDF points to pixels at the given resolution, truncating toward zero.
pub fn points_to_pixels(points: f32, dpi: f32) -> i32 {
    (points * dpi / POINTS_PER_INCH) as i32
}

/// Convert PDF points to pixels in the layout space.
pub fn pdf_points_to_pixels(points: f32) -> i32 {
    points_to_pixels(points, LAYOUT_DPI)
}

/// Convert twentieths of a point (twips) to pixels.
pub fn twips_to_pixels(twips: i64) -> i32 {
    // 1440 twips per inch
    (twips * 96 / 1440) as i32
}

/// Convert half-points (`w:sz`) to points.
pub fn half_points_to_points(half_points: u32) -> f32 {
    half_points as f32 / 2.0
}

/// Rescale a pixel length from one resolution to another, truncating.
pub fn rescale(pixels: i32, from_dpi: f32, to_dpi: f32) -> i32 {
    if from_dpi <= 0.0 {
        return 0;
    }
    (pixels as f32 * to_dpi / from_dpi) as i32
}

/// Parse a CSS-like length as used in VML `style` attributes ("72pt", "1in",
/// "2.54cm", "96px", "10mm") into pixels. A bare number is taken as points.
pub fn css_length_to_pixels(value: &str) -> Option<i32> {
    let value = value.trim();
    let split = value
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f32 = number.trim().parse().ok()?;

    let inches = match unit.trim() {
        "" | "pt" => number / POINTS_PER_INCH,
        "in" => number,
        "cm" => number / 2.54,
        "mm" => number / 25.4,
        "px" => return Some(number as i32),
        "emu" => number / EMU_PER_INCH as f32,
        _ => return None,
    };
    Some((inches * LAYOUT_DPI) as i32)
}
