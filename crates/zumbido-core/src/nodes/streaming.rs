//! Streaming sampler kernel: plays a disk-backed stream chunk by chunk.
//!
//! Trigger and pitch behave like the embedded sampler, but sample data
//! arrives through the stream's bound [`StreamSource`](crate::StreamSource)
//! one chunk at a time. Crossing into the next chunk flips the resident
//! buffer (using the prefetched copy when the backend has one ready);
//! passing three quarters of the current chunk queues the next prefetch.

use crate::chunk::Node;
use crate::hash::keys;
use crate::stream::StreamSlot;

use super::KernelCtx;

/// Streaming sampler scratch state.
#[derive(Default)]
pub(crate) struct StreamingState {
    position: f64,
    playing: bool,
    last_trigger: f32,
}

/// Reads the frame at absolute `position` from the resident chunk,
/// averaging channels and interpolating toward the next in-chunk frame.
fn read_resident(slot: &StreamSlot, position: f64) -> f32 {
    let channels = slot.desc.channel_count.max(1) as usize;
    let chunk_size = slot.desc.chunk_size as usize;
    if chunk_size == 0 || slot.buffer.is_empty() {
        return 0.0;
    }

    let frame = position as u64 as usize;
    let local = frame % chunk_size;
    let fract = (position - position.floor()) as f32;

    let frame_at = |local_frame: usize| -> f32 {
        let base = local_frame * channels;
        let mut acc = 0.0;
        for ch in 0..channels {
            acc += slot.buffer.get(base + ch).copied().unwrap_or(0.0);
        }
        acc / channels as f32
    };

    if local + 1 < chunk_size {
        frame_at(local) * (1.0 - fract) + frame_at(local + 1) * fract
    } else {
        // Last frame of the chunk: hold rather than interpolate across the
        // boundary; the next read comes from the following chunk.
        frame_at(local)
    }
}

pub(crate) fn process(
    state: &mut StreamingState,
    node: &Node,
    ctx: &KernelCtx<'_>,
    streams: &mut [StreamSlot],
    out: &mut [f32],
) {
    let stream_index = ctx
        .params
        .node_value(node, keys::STREAM_INDEX)
        .unwrap_or(0.0) as usize;
    let mut pitch = ctx.params.node_value(node, keys::PITCH).unwrap_or(1.0);
    if pitch == 0.0 {
        pitch = 1.0;
    }
    let start = ctx
        .params
        .node_value(node, keys::START_POSITION)
        .unwrap_or(0.0);

    let Some(slot) = streams.get_mut(stream_index) else {
        out[..ctx.frames].fill(0.0);
        return;
    };

    let chunk_size = slot.desc.chunk_size;
    let total = slot.desc.total_samples;
    let chunk_count = slot.desc.chunks_needed();
    if chunk_size == 0 || total == 0 {
        out[..ctx.frames].fill(0.0);
        return;
    }

    let rate_ratio = slot.desc.sample_rate as f32 / ctx.sample_rate;
    let playback_rate = f64::from(pitch * rate_ratio);

    for i in 0..ctx.frames {
        let trigger = ctx.inputs.sum(0, i);
        if trigger > 0.5 && state.last_trigger <= 0.5 {
            state.playing = true;
            state.position = f64::from(start) * f64::from(total);
            let chunk = (state.position as u64 / u64::from(chunk_size)) as u32;
            slot.flip_to(chunk);
        }
        state.last_trigger = trigger;

        if !state.playing {
            out[i] = 0.0;
            continue;
        }

        out[i] = read_resident(slot, state.position);
        state.position += playback_rate;

        let next_chunk = (state.position as u64 / u64::from(chunk_size)) as u32;
        if next_chunk != slot.current_chunk && next_chunk < chunk_count {
            slot.flip_to(next_chunk);
        } else {
            let local = state.position as u64 % u64::from(chunk_size);
            if local >= u64::from(chunk_size) * 3 / 4 && slot.current_chunk + 1 < chunk_count {
                slot.request_prefetch(slot.current_chunk + 1);
            }
        }

        if state.position >= f64::from(total) {
            state.playing = false;
            state.position = 0.0;
        }
    }
}
