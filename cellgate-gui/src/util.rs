//! Numeric conversions and pixel/plot coordinate mapping.

#[allow(clippy::cast_precision_loss)]
pub fn usize_to_f64(value: usize) -> f64 {
    value as f64
}

/// Bar height for a histogram count.
#[allow(clippy::cast_precision_loss)]
pub fn u64_to_f64(value: u64) -> f64 {
    value as f64
}

/// Rounds to the nearest byte, saturating outside `0..=255`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f32_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Truncates a coordinate to an index below `len`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn index_below(value: f64, len: usize) -> Option<usize> {
    (value.is_finite() && value >= 0.0 && value < usize_to_f64(len)).then_some(value as usize)
}

/// Plot coordinates of an image pixel position.
///
/// Image rows grow downwards while plot y grows upwards, so row `r` of an
/// image `height` rows tall is drawn at `height - r`.
pub fn image_to_plot(row: f64, col: f64, height: usize) -> [f64; 2] {
    [col, usize_to_f64(height) - row]
}

/// Image (row, column) under a plot position, if inside the image.
pub fn plot_to_pixel(x: f64, y: f64, height: usize, width: usize) -> Option<(usize, usize)> {
    let row = index_below(usize_to_f64(height) - y, height)?;
    let col = index_below(x, width)?;
    Some((row, col))
}

/// Cell count with thousands separators.
#[must_use]
pub fn format_number(n: usize) -> String {
    let digits = n.to_string().into_bytes();
    let groups: Vec<&str> = digits
        .rchunks(3)
        .rev()
        .filter_map(|g| std::str::from_utf8(g).ok())
        .collect();
    groups.join(",")
}
