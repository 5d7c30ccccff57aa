//! Distortion kernel with six shaper variants.
//!
//! `driven = input × drive` runs through the selected shaper, then blends
//! with the dry signal: `out = dry·(1−mix) + wet·mix`. The first five
//! shapers are the pure functions in [`crate::shape`]; the sixth, Beeper,
//! is a stateful 1-bit emulation: a ±0.1 hysteresis dead zone holds the
//! previous output, and a 237 Hz buzz modulates the result at 5% depth.

use core::f32::consts::TAU;
use libm::sinf;

use crate::chunk::Node;
use crate::hash::keys;
use crate::shape;

use super::KernelCtx;

/// Hysteresis dead-zone threshold for the Beeper shaper.
const BEEPER_THRESHOLD: f32 = 0.1;
/// Buzz oscillator frequency multiplier.
const BEEPER_BUZZ_RATE: f32 = 237.0;

/// Distortion scratch: Beeper hysteresis and buzz phase.
#[derive(Default)]
pub(crate) struct DistortionState {
    held: f32,
    buzz_phase: f32,
}

pub(crate) fn process(
    state: &mut DistortionState,
    node: &Node,
    ctx: &KernelCtx<'_>,
    out: &mut [f32],
) {
    let drive = ctx.params.node_value(node, keys::DRIVE).unwrap_or(1.0);
    let mix = ctx.params.node_value(node, keys::MIX).unwrap_or(1.0);
    let shaper = ctx.params.node_value(node, keys::TYPE).unwrap_or(0.0) as u32;

    for i in 0..ctx.frames {
        let dry = ctx.inputs.sum(0, i);
        let driven = dry * drive;

        let wet = match shaper {
            0 => shape::hard_clip(driven),
            1 => shape::soft_clip(driven),
            2 => shape::foldback(driven),
            3 => shape::bit_crush(driven),
            4 => shape::overdrive(driven),
            5 => {
                let mut wet = if driven > BEEPER_THRESHOLD {
                    state.held = 1.0;
                    1.0
                } else if driven < -BEEPER_THRESHOLD {
                    state.held = -1.0;
                    -1.0
                } else {
                    state.held
                };
                state.buzz_phase += 0.1;
                if state.buzz_phase > TAU {
                    state.buzz_phase -= TAU;
                }
                wet *= 0.95 + 0.05 * sinf(state.buzz_phase * BEEPER_BUZZ_RATE);
                wet
            }
            _ => driven,
        };

        out[i] = dry * (1.0 - mix) + wet * mix;
    }
}
