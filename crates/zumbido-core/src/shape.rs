//! Stateless waveshaping functions used by the distortion kernel.
//!
//! Kept as free functions so tests and tools can exercise the transfer
//! curves directly. The beeper shaper is stateful (hysteresis + buzz
//! phase) and lives with the kernel instead.

use libm::{expf, roundf, tanhf};

/// Bit-crush quantization levels (4-bit).
const CRUSH_LEVELS: f32 = 16.0;

/// Hard clip to `[-1, 1]`.
#[inline]
#[must_use]
pub fn hard_clip(x: f32) -> f32 {
    x.clamp(-1.0, 1.0)
}

/// Smooth tanh saturation.
#[inline]
#[must_use]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Wavefolding: reflects the signal back across ±1 until it fits.
#[inline]
#[must_use]
pub fn foldback(x: f32) -> f32 {
    if !x.is_finite() {
        return 0.0;
    }
    let mut folded = x;
    while folded > 1.0 {
        folded = 2.0 - folded;
    }
    while folded < -1.0 {
        folded = -2.0 - folded;
    }
    folded
}

/// Quantizes to 4-bit levels.
#[inline]
#[must_use]
pub fn bit_crush(x: f32) -> f32 {
    roundf(roundf(x) * CRUSH_LEVELS) / CRUSH_LEVELS
}

/// Asymmetric tube-style overdrive.
#[inline]
#[must_use]
pub fn overdrive(x: f32) -> f32 {
    if x > 0.0 {
        1.0 - expf(-x)
    } else {
        -1.0 + expf(0.7 * x)
    }
}
