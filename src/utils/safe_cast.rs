//! Saturating float-to-integer conversions for pixel geometry

/// Clamp and convert f64 to u32 for pixel coordinates
#[must_use]
// Clamping ensures safe truncation
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f64_to_u32_clamp(value: f64, min: u32, max: u32) -> u32 {
    // Ensure min <= max
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    let clamped = value.clamp(f64::from(min), f64::from(max));

    let result = clamped as u32;
    result.clamp(min, max)
}

/// Round f64 to the nearest i64, saturating at the i64 range
#[must_use]
#[allow(clippy::cast_possible_truncation)] // `as` saturates for out-of-range floats
pub fn f64_to_i64_round(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    value.round() as i64
}
