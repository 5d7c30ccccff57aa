//! Sampler kernel: plays an embedded wavetable.
//!
//! Input 0 is the trigger — a rising edge (≤ 0.5 → > 0.5) starts playback
//! at `start_position × length`. Input 1 adds to `pitch` when connected.
//! Playback advances by `pitch × source_rate / engine_rate` with linear
//! interpolation; stereo sources downmix to mono by averaging. Non-looping
//! playback stops at the end; looping playback wraps inside the sample's
//! loop window.

use crate::chunk::{Node, SampleData};
use crate::hash::keys;

use super::KernelCtx;

/// Sampler scratch state.
#[derive(Default)]
pub(crate) struct SamplerState {
    position: f64,
    playing: bool,
    last_trigger: f32,
}

/// Reads frame `position` with linear interpolation, averaging channels.
fn interpolate(sample: &SampleData, position: f64) -> f32 {
    let channels = sample.channel_count.max(1) as usize;
    let frames = sample.frames();
    let index = position as usize;
    let fract = (position - index as f64) as f32;

    let frame_at = |frame: usize| -> f32 {
        let base = frame * channels;
        let mut acc = 0.0;
        for ch in 0..channels {
            acc += sample.data.get(base + ch).copied().unwrap_or(0.0);
        }
        acc / channels as f32
    };

    if index + 1 < frames {
        frame_at(index) * (1.0 - fract) + frame_at(index + 1) * fract
    } else if index < frames {
        frame_at(index)
    } else {
        0.0
    }
}

pub(crate) fn process(
    state: &mut SamplerState,
    node: &Node,
    ctx: &KernelCtx<'_>,
    samples: &[SampleData],
    out: &mut [f32],
) {
    let sample_index = ctx
        .params
        .node_value(node, keys::SAMPLE_INDEX)
        .unwrap_or(0.0) as usize;
    let pitch = ctx.params.node_value(node, keys::PITCH).unwrap_or(1.0);
    let start = ctx
        .params
        .node_value(node, keys::START_POSITION)
        .unwrap_or(0.0);
    let looping = ctx.params.node_value(node, keys::LOOP).unwrap_or(0.0) > 0.5;

    let Some(sample) = samples.get(sample_index) else {
        out[..ctx.frames].fill(0.0);
        return;
    };
    let frames_total = sample.frames();
    let rate_ratio = sample.sample_rate as f32 / ctx.sample_rate;
    let pitch_modulated = ctx.inputs.is_connected(1);

    for i in 0..ctx.frames {
        let trigger = ctx.inputs.sum(0, i);
        if trigger > 0.5 && state.last_trigger <= 0.5 {
            state.playing = true;
            state.position = f64::from(start) * frames_total as f64;
        }
        state.last_trigger = trigger;

        if !state.playing || sample.data.is_empty() {
            out[i] = 0.0;
            continue;
        }

        let final_pitch = if pitch_modulated {
            pitch + ctx.inputs.sum(1, i)
        } else {
            pitch
        };
        let playback_rate = f64::from(final_pitch * rate_ratio);

        out[i] = interpolate(sample, state.position);
        state.position += playback_rate;

        if looping && sample.has_loop {
            let loop_start = f64::from(sample.loop_start);
            let loop_end = f64::from(sample.loop_end);
            if state.position >= loop_end && loop_end > loop_start {
                state.position = loop_start + (state.position - loop_end) % (loop_end - loop_start);
            }
        } else if state.position >= frames_total as f64 {
            state.playing = false;
            out[i] = 0.0;
        }
    }
}
