//! `zumbido demo` - author a small demonstration patch.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use zumbido_core::{ChunkBuilder, NodeType};

/// Arguments for the `demo` subcommand.
#[derive(Args)]
pub struct DemoArgs {
    /// Output chunk path
    #[arg(short, long, default_value = "demo.audi")]
    pub out: PathBuf,

    /// Chunk sample rate in Hz
    #[arg(long, default_value_t = 48_000)]
    pub rate: u32,
}

pub fn run(args: &DemoArgs) -> anyhow::Result<()> {
    let bytes = demo_patch(args.rate);
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("writing {}", args.out.display()))?;
    println!("wrote {} ({} bytes)", args.out.display(), bytes.len());
    Ok(())
}

/// Gate → ADSR → amplifier modulation over a filtered saw: the classic
/// one-finger synth voice, exercising most node kinds.
pub fn demo_patch(sample_rate: u32) -> Vec<u8> {
    let mut b = ChunkBuilder::new(sample_rate);

    let gate = b.node(NodeType::Parameter, 0, 1);
    b.param("gate", 0.0, 0.0, 1.0);

    let osc = b.node(NodeType::Oscillator, 1, 1);
    b.param("frequency", 110.0, 20.0, 20_000.0)
        .param("waveform", 2.0, 0.0, 4.0);

    let env = b.node(NodeType::Envelope, 1, 1);
    b.param("attack", 0.005, 0.0, 10.0)
        .param("decay", 0.12, 0.0, 10.0)
        .param("sustain", 0.6, 0.0, 1.0)
        .param("release", 0.25, 0.0, 10.0);

    let filter = b.node(NodeType::Filter, 2, 1);
    b.param("cutoff", 1_800.0, 20.0, 20_000.0)
        .param("resonance", 1.1, 0.1, 10.0)
        .param("type", 0.0, 0.0, 2.0);

    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", 0.8, 0.0, 1.0);

    b.connect(gate, 0, env, 0, 1.0);
    b.connect(osc, 0, filter, 0, 1.0);
    b.connect(filter, 0, amp, 0, 1.0);
    b.connect(env, 0, amp, 1, 1.0);

    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zumbido_core::{Processor, decode};

    #[test]
    fn demo_patch_decodes_and_makes_sound() {
        let bytes = demo_patch(48_000);
        let chunk = decode(&bytes).unwrap();
        assert_eq!(chunk.nodes.len(), 5);

        let p = Processor::new(48_000);
        p.load(&bytes).unwrap();
        let mut out = vec![0.0f32; 4800 * 2];
        p.process(&mut out, 4800, 2);
        assert!(out.iter().any(|&s| s.abs() > 0.01), "demo patch is silent");
    }
}
