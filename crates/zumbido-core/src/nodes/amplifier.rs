//! Amplifier kernel.
//!
//! Output = input 0 × `amplitude` × input 1. Input 1 is modulation
//! (typically an envelope) and defaults to unity when nothing is connected
//! to it. A trailing amplifier with no outgoing connection doubles as the
//! graph's output sink.

use crate::chunk::Node;
use crate::hash::keys;

use super::KernelCtx;

pub(crate) fn process(node: &Node, ctx: &KernelCtx<'_>, out: &mut [f32]) {
    let amplitude = ctx.params.node_value(node, keys::AMPLITUDE).unwrap_or(1.0);
    let modulated = ctx.inputs.is_connected(1);

    for i in 0..ctx.frames {
        let audio = ctx.inputs.sum(0, i);
        let modulation = if modulated { ctx.inputs.sum(1, i) } else { 1.0 };
        out[i] = audio * amplitude * modulation;
    }
}

#[cfg(test)]
mod tests {
    use super::super::Kernel;
    use super::super::testutil::KernelRun;
    use crate::chunk::NodeType;

    #[test]
    fn unity_gain_with_no_modulation_is_identity() {
        let signal = vec![0.1, -0.2, 0.3, -0.4];
        let run = KernelRun::new(NodeType::Amplifier, 2)
            .param("amplitude", 1.0)
            .input(0, signal.clone(), 1.0);
        let mut kernel = Kernel::for_node(&run.node);
        assert_eq!(run.run(&mut kernel, 4), signal);
    }

    #[test]
    fn modulation_input_scales_per_sample() {
        let run = KernelRun::new(NodeType::Amplifier, 2)
            .param("amplitude", 2.0)
            .input(0, vec![1.0; 4], 1.0)
            .input(1, vec![0.0, 0.25, 0.5, 1.0], 1.0);
        let mut kernel = Kernel::for_node(&run.node);
        assert_eq!(run.run(&mut kernel, 4), vec![0.0, 0.5, 1.0, 2.0]);
    }

    #[test]
    fn connection_strength_applies_before_gain() {
        let run = KernelRun::new(NodeType::Amplifier, 2)
            .param("amplitude", 1.0)
            .input(0, vec![1.0; 2], 0.5);
        let mut kernel = Kernel::for_node(&run.node);
        assert_eq!(run.run(&mut kernel, 2), vec![0.5, 0.5]);
    }

    #[test]
    fn missing_amplitude_defaults_to_unity() {
        let run = KernelRun::new(NodeType::Amplifier, 2).input(0, vec![0.7; 2], 1.0);
        let mut kernel = Kernel::for_node(&run.node);
        assert_eq!(run.run(&mut kernel, 2), vec![0.7, 0.7]);
    }
}
