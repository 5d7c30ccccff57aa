//! Biquad filter kernel (lowpass, highpass, bandpass).
//!
//! Coefficients come from the RBJ Audio EQ Cookbook with
//! `ω = 2π·cutoff/fs` and `α = sin(ω)/(2Q)`, normalized by `a0`. Input 0
//! is the audio signal; input 1 is additive cutoff modulation — when a
//! modulation sample is non-zero the coefficients are recomputed for that
//! frame with the modulated cutoff clamped to the audible range.

use core::f32::consts::TAU;
use libm::{cosf, sinf};

use crate::chunk::Node;
use crate::hash::keys;

use super::KernelCtx;

/// Cutoff clamp range in Hz.
const CUTOFF_MIN: f32 = 20.0;
const CUTOFF_MAX: f32 = 20_000.0;

/// Filter scratch: the Direct Form I delay line.
#[derive(Default)]
pub(crate) struct FilterState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

/// Normalized biquad coefficients `(b0, b1, b2, a1, a2)`.
fn coefficients(filter_type: u32, cutoff: f32, q: f32, sample_rate: f32) -> (f32, f32, f32, f32, f32) {
    let omega = TAU * cutoff / sample_rate;
    let sin_omega = sinf(omega);
    let cos_omega = cosf(omega);
    let alpha = sin_omega / (2.0 * q);

    let (b0, b1, b2, a0, a1, a2) = match filter_type {
        // Lowpass
        0 => (
            (1.0 - cos_omega) / 2.0,
            1.0 - cos_omega,
            (1.0 - cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        ),
        // Highpass
        1 => (
            (1.0 + cos_omega) / 2.0,
            -(1.0 + cos_omega),
            (1.0 + cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        ),
        // Bandpass (constant skirt gain)
        2 => (
            sin_omega / 2.0,
            0.0,
            -sin_omega / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        ),
        // Reserved values pass the signal through unfiltered.
        _ => (1.0, 0.0, 0.0, 1.0, 0.0, 0.0),
    };

    (b0 / a0, b1 / a0, b2 / a0, a1 / a0, a2 / a0)
}

pub(crate) fn process(state: &mut FilterState, node: &Node, ctx: &KernelCtx<'_>, out: &mut [f32]) {
    let cutoff = ctx
        .params
        .node_value(node, keys::CUTOFF)
        .unwrap_or(1000.0)
        .clamp(CUTOFF_MIN, CUTOFF_MAX);
    let q = ctx.params.node_value(node, keys::RESONANCE).unwrap_or(0.707);
    let filter_type = ctx.params.node_value(node, keys::TYPE).unwrap_or(0.0) as u32;

    let base = coefficients(filter_type, cutoff, q, ctx.sample_rate);

    for i in 0..ctx.frames {
        let input = ctx.inputs.sum(0, i);
        let cutoff_mod = ctx.inputs.sum(1, i);

        let (b0, b1, b2, a1, a2) = if cutoff_mod != 0.0 {
            let modulated = (cutoff + cutoff_mod).clamp(CUTOFF_MIN, CUTOFF_MAX);
            coefficients(filter_type, modulated, q, ctx.sample_rate)
        } else {
            base
        };

        let output =
            b0 * input + b1 * state.x1 + b2 * state.x2 - a1 * state.y1 - a2 * state.y2;

        state.x2 = state.x1;
        state.x1 = input;
        state.y2 = state.y1;
        state.y1 = output;

        out[i] = output;
    }
}
