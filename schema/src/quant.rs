//! Scalar quantizers.
//!
//! Each quantizer maps a float onto a fixed-width integer code and back.
//! Decoding a code and re-encoding the result yields the same code, so a
//! value that already went through a quantizer survives further round trips
//! unchanged.

use half::f16;

/// Number of distinct angle codes.
pub const ANGLE_STEPS: u32 = 65536;

/// Worst-case error of an angle round trip, in degrees.
pub const ANGLE_PRECISION: f32 = 360.0 / ANGLE_STEPS as f32;

/// Converts an `f32` to IEEE 754 binary16 bits.
#[must_use]
pub fn float_to_half(value: f32) -> u16 {
    f16::from_f32(value).to_bits()
}

/// Converts IEEE 754 binary16 bits to an `f32`.
#[must_use]
pub fn half_to_float(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

/// Normalizes an angle in degrees into `[0, 360)`. Non-finite input maps to 0.
#[must_use]
pub fn normalize_angle(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round tiny negatives up to exactly 360.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Quantizes an angle in degrees to 16 bits.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn angle_to_u16(degrees: f32) -> u16 {
    let normalized = f64::from(normalize_angle(degrees));
    (normalized * 65535.0 / 360.0).round() as u16
}

/// Expands a 16-bit angle code to degrees in `[0, 360)`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn u16_to_angle(code: u16) -> f32 {
    let degrees = (f64::from(code) * 360.0 / 65535.0) as f32;
    if degrees >= 360.0 {
        0.0
    } else {
        degrees
    }
}
