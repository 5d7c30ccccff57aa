//! Mixer kernel: sums inputs with per-input gains and a master gain.
//!
//! Each input `k` has an optional `gain_k` parameter (default unity); the
//! summed result is scaled by `master_gain`. The `gain_k` hashes are
//! precomputed at load so the audio path never formats names.

use crate::chunk::Node;
use crate::hash::{fnv1a_hash, keys};

use super::KernelCtx;

/// Mixer scratch: precomputed gain hashes and a reusable gain buffer.
pub(crate) struct MixerState {
    gain_hashes: Vec<u64>,
    gains: Vec<f32>,
}

impl MixerState {
    pub fn new(input_count: u32) -> Self {
        let gain_hashes = (0..input_count)
            .map(|k| fnv1a_hash(&format!("gain_{k}")))
            .collect();
        Self {
            gain_hashes,
            gains: Vec::with_capacity(input_count as usize),
        }
    }
}

pub(crate) fn process(state: &mut MixerState, node: &Node, ctx: &KernelCtx<'_>, out: &mut [f32]) {
    let master = ctx.params.node_value(node, keys::MASTER_GAIN).unwrap_or(1.0);

    state.gains.clear();
    for &hash in &state.gain_hashes {
        state
            .gains
            .push(ctx.params.node_value(node, hash).unwrap_or(1.0));
    }

    for i in 0..ctx.frames {
        let mut mixed = 0.0;
        for (input, &gain) in state.gains.iter().enumerate() {
            mixed += ctx.inputs.sum(input, i) * gain;
        }
        out[i] = mixed * master;
    }
}

#[cfg(test)]
mod tests {
    use super::super::Kernel;
    use super::super::testutil::KernelRun;
    use crate::chunk::NodeType;

    #[test]
    fn sums_inputs_with_gains() {
        let run = KernelRun::new(NodeType::Mixer, 2)
            .param("gain_0", 1.0)
            .param("gain_1", 0.5)
            .param("master_gain", 2.0)
            .input(0, vec![1.0; 4], 1.0)
            .input(1, vec![1.0; 4], 1.0);
        let mut kernel = Kernel::for_node(&run.node);
        // (1*1 + 1*0.5) * 2 = 3
        assert_eq!(run.run(&mut kernel, 4), vec![3.0; 4]);
    }

    #[test]
    fn gains_default_to_unity() {
        let run = KernelRun::new(NodeType::Mixer, 2)
            .input(0, vec![0.25; 2], 1.0)
            .input(1, vec![0.25; 2], 1.0);
        let mut kernel = Kernel::for_node(&run.node);
        assert_eq!(run.run(&mut kernel, 2), vec![0.5; 2]);
    }

    #[test]
    fn connection_strength_composes_with_input_gain() {
        let run = KernelRun::new(NodeType::Mixer, 1)
            .param("gain_0", 0.5)
            .input(0, vec![1.0; 2], 0.5);
        let mut kernel = Kernel::for_node(&run.node);
        assert_eq!(run.run(&mut kernel, 2), vec![0.25; 2]);
    }

    #[test]
    fn unconnected_inputs_contribute_silence() {
        let run = KernelRun::new(NodeType::Mixer, 4).input(2, vec![1.0; 2], 1.0);
        let mut kernel = Kernel::for_node(&run.node);
        assert_eq!(run.run(&mut kernel, 2), vec![1.0; 2]);
    }
}
