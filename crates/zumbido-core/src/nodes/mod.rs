//! Per-node DSP kernels.
//!
//! Each node type has one kernel: a function that writes `frames` mono
//! samples into the node's output buffer, reading summed inputs, node
//! parameters, and its own scratch state. The scheduler dispatches through
//! [`Kernel`], a tagged sum over the per-kind scratch so state lives in a
//! single flat array parallel to the nodes.

pub(crate) mod amplifier;
pub(crate) mod distortion;
pub(crate) mod envelope;
pub(crate) mod filter;
pub(crate) mod mixer;
pub(crate) mod oscillator;
pub(crate) mod parameter;
pub(crate) mod sampler;
pub(crate) mod streaming;

use std::sync::atomic::{AtomicU32, Ordering};

use crate::chunk::{Node, NodeType, SampleData};
use crate::param::ParamStore;
use crate::stream::StreamSlot;

use distortion::DistortionState;
use envelope::EnvelopeState;
use filter::FilterState;
use mixer::MixerState;
use oscillator::OscillatorState;
use sampler::SamplerState;
use streaming::StreamingState;

/// Per-node scratch state, tagged by node kind.
pub(crate) enum Kernel {
    Oscillator(OscillatorState),
    Amplifier,
    Parameter,
    Mixer(MixerState),
    Envelope(EnvelopeState),
    Filter(FilterState),
    Distortion(DistortionState),
    Sampler(SamplerState),
    StreamingSampler(StreamingState),
    /// Reserved node types produce silence.
    Inert,
}

impl Kernel {
    /// Builds the scratch state for a decoded node record.
    pub fn for_node(node: &Node) -> Self {
        match node.kind() {
            Some(NodeType::Oscillator) => Self::Oscillator(OscillatorState::default()),
            Some(NodeType::Amplifier) => Self::Amplifier,
            Some(NodeType::Parameter) => Self::Parameter,
            Some(NodeType::Mixer) => Self::Mixer(MixerState::new(node.input_count)),
            Some(NodeType::Envelope) => Self::Envelope(EnvelopeState::default()),
            Some(NodeType::Filter) => Self::Filter(FilterState::default()),
            Some(NodeType::Distortion) => Self::Distortion(DistortionState::default()),
            Some(NodeType::Sampler) => Self::Sampler(SamplerState::default()),
            Some(NodeType::StreamingSampler) => Self::StreamingSampler(StreamingState::default()),
            None => Self::Inert,
        }
    }

    /// Runs the kernel for one block, writing `ctx.frames` samples to `out`.
    pub fn process(
        &mut self,
        node: &Node,
        ctx: &KernelCtx<'_>,
        env: &mut KernelEnv<'_>,
        out: &mut [f32],
    ) {
        match self {
            Self::Oscillator(state) => oscillator::process(state, node, ctx, env.rng, out),
            Self::Amplifier => amplifier::process(node, ctx, out),
            Self::Parameter => parameter::process(node, ctx, out),
            Self::Mixer(state) => mixer::process(state, node, ctx, out),
            Self::Envelope(state) => envelope::process(state, node, ctx, out),
            Self::Filter(state) => filter::process(state, node, ctx, out),
            Self::Distortion(state) => distortion::process(state, node, ctx, out),
            Self::Sampler(state) => sampler::process(state, node, ctx, env.samples, out),
            Self::StreamingSampler(state) => streaming::process(state, node, ctx, env.streams, out),
            Self::Inert => out.fill(0.0),
        }
    }
}

/// Read-only per-block context shared by every kernel.
pub(crate) struct KernelCtx<'a> {
    /// Frames in this block.
    pub frames: usize,
    /// Engine sample rate in Hz.
    pub sample_rate: f32,
    /// Absolute time at the start of the block, seconds.
    pub time: f32,
    /// Parameter store for slice/global lookups.
    pub params: &'a ParamStore,
    /// Gathered input sums for the node being processed.
    pub inputs: &'a InputScratch,
}

/// Mutable engine resources a kernel may need.
pub(crate) struct KernelEnv<'a> {
    pub rng: &'a mut Xorshift32,
    pub samples: &'a [SampleData],
    pub streams: &'a mut [StreamSlot],
}

/// Summed per-input signal rows for the node currently being processed.
///
/// The scheduler fills one row per input index before dispatching the
/// kernel: `row[frame] += source.output[frame] * connection.strength`
/// across every connection targeting that input. Rows are reused between
/// nodes and calls, so steady-state processing does not allocate.
#[derive(Default)]
pub(crate) struct InputScratch {
    rows: Vec<Vec<f32>>,
    connected: Vec<bool>,
    active: usize,
}

impl InputScratch {
    /// Zeroes `inputs` rows of `frames` samples for the next node.
    pub fn prepare(&mut self, inputs: usize, frames: usize) {
        if self.rows.len() < inputs {
            self.rows.resize_with(inputs, Vec::new);
            self.connected.resize(inputs, false);
        }
        self.active = inputs;
        for row in &mut self.rows[..inputs] {
            row.clear();
            row.resize(frames, 0.0);
        }
        for flag in &mut self.connected[..inputs] {
            *flag = false;
        }
    }

    /// Adds one connection's contribution to an input row.
    pub fn accumulate(&mut self, input: usize, source: &[f32], strength: f32) {
        if input >= self.active {
            return;
        }
        self.connected[input] = true;
        for (dst, &src) in self.rows[input].iter_mut().zip(source) {
            *dst += src * strength;
        }
    }

    /// Summed input value at `frame`, 0.0 for absent rows.
    #[inline]
    pub fn sum(&self, input: usize, frame: usize) -> f32 {
        if input < self.active {
            self.rows[input].get(frame).copied().unwrap_or(0.0)
        } else {
            0.0
        }
    }

    /// Whether any connection targets this input.
    #[inline]
    pub fn is_connected(&self, input: usize) -> bool {
        input < self.active && self.connected[input]
    }
}

/// Xorshift32 noise generator.
///
/// One generator per processor instance, seeded from a process-wide
/// counter: deterministic within an instance, documented-nondeterministic
/// across instances.
pub(crate) struct Xorshift32 {
    state: u32,
}

static INSTANCE_SEED: AtomicU32 = AtomicU32::new(0x1234_5678);

impl Xorshift32 {
    pub fn from_instance_counter() -> Self {
        let seed = INSTANCE_SEED.fetch_add(0x9E37_79B9, Ordering::Relaxed);
        Self::new(seed)
    }

    pub fn new(seed: u32) -> Self {
        Self {
            state: seed | 1, // xorshift must not start at zero
        }
    }

    /// Next sample, uniform in `[-1, 1]`.
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as i32 as f32) / (i32::MAX as f32)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Minimal harness for exercising one kernel in isolation.

    use super::*;
    use crate::chunk::Parameter;

    pub struct KernelRun {
        pub node: Node,
        pub params: Vec<Parameter>,
        pub inputs: Vec<(usize, Vec<f32>, f32)>,
        pub sample_rate: f32,
        pub time: f32,
        pub samples: Vec<SampleData>,
    }

    impl KernelRun {
        pub fn new(node_type: NodeType, input_count: u32) -> Self {
            Self {
                node: Node {
                    id: 1,
                    node_type: node_type as u32,
                    input_count,
                    output_count: 1,
                    param_offset: 0,
                    param_count: 0,
                },
                params: Vec::new(),
                inputs: Vec::new(),
                sample_rate: 48_000.0,
                time: 0.0,
                samples: Vec::new(),
            }
        }

        pub fn param(mut self, name: &str, value: f32) -> Self {
            self.node.param_count += 1;
            self.params.push(Parameter {
                name_hash: crate::hash::fnv1a_hash(name),
                default_value: value,
                min_value: f32::MIN,
                max_value: f32::MAX,
            });
            self
        }

        pub fn input(mut self, index: usize, signal: Vec<f32>, strength: f32) -> Self {
            self.inputs.push((index, signal, strength));
            self
        }

        /// Runs `kernel` for `frames` samples and returns the output.
        pub fn run(&self, kernel: &mut Kernel, frames: usize) -> Vec<f32> {
            let store = ParamStore::from_records(&self.params);
            let mut scratch = InputScratch::default();
            let max_input = self
                .inputs
                .iter()
                .map(|(i, _, _)| i + 1)
                .max()
                .unwrap_or(0)
                .max(self.node.input_count as usize);
            scratch.prepare(max_input, frames);
            for (index, signal, strength) in &self.inputs {
                scratch.accumulate(*index, signal, *strength);
            }

            let ctx = KernelCtx {
                frames,
                sample_rate: self.sample_rate,
                time: self.time,
                params: &store,
                inputs: &scratch,
            };
            let mut rng = Xorshift32::new(0xACED_5EED);
            let mut streams: Vec<crate::stream::StreamSlot> = Vec::new();
            let mut env = KernelEnv {
                rng: &mut rng,
                samples: &self.samples,
                streams: &mut streams,
            };
            let mut out = vec![0.0; frames];
            kernel.process(&self.node, &ctx, &mut env, &mut out);
            out
        }
    }
}
