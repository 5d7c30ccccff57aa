//! Parameter kernel: emits a parameter value as a signal.
//!
//! The node's slice head (the parameter at `param_offset`) is broadcast
//! across the block. One carve-out: when that parameter is `gate`, the node
//! emits a one-shot trigger instead — 1.0 while absolute time is below
//! 0.1 s, 0.0 after — overriding the stored value.

use crate::chunk::Node;
use crate::hash::keys;

use super::KernelCtx;

/// Length of the one-shot gate pulse in seconds.
const GATE_PULSE_SECONDS: f32 = 0.1;

pub(crate) fn process(node: &Node, ctx: &KernelCtx<'_>, out: &mut [f32]) {
    if node.param_count == 0 {
        out.fill(0.0);
        return;
    }
    let Some((hash, value)) = ctx.params.slot_at(node.param_offset as usize) else {
        out.fill(0.0);
        return;
    };

    if hash == keys::GATE {
        let sample_time = 1.0 / ctx.sample_rate;
        for i in 0..ctx.frames {
            let t = ctx.time + i as f32 * sample_time;
            out[i] = if t < GATE_PULSE_SECONDS { 1.0 } else { 0.0 };
        }
    } else {
        out[..ctx.frames].fill(value);
    }
}
