//! `zumbido info` - decode a chunk and print its inventory.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use zumbido_core::{NodeType, decode};

/// Arguments for the `info` subcommand.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the AUDI chunk file
    pub chunk: PathBuf,
}

pub fn run(args: &InfoArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.chunk)
        .with_context(|| format!("reading {}", args.chunk.display()))?;
    let chunk = decode(&bytes).context("decoding AUDI chunk")?;

    println!("AUDI chunk: {} ({} bytes)", args.chunk.display(), bytes.len());
    println!("  sample rate: {} Hz", chunk.sample_rate);
    println!("  nodes: {}", chunk.nodes.len());
    for node in &chunk.nodes {
        println!(
            "    #{:<3} {:<18} inputs={} outputs={} params={}..{}",
            node.id,
            type_name(node.kind()),
            node.input_count,
            node.output_count,
            node.param_offset,
            node.param_offset + node.param_count,
        );
    }

    println!("  connections: {}", chunk.connections.len());
    for conn in &chunk.connections {
        println!(
            "    {}[{}] -> {}[{}] (strength {})",
            conn.source_node, conn.source_output, conn.dest_node, conn.dest_input, conn.strength
        );
    }

    println!("  parameters: {}", chunk.parameters.len());
    for (index, param) in chunk.parameters.iter().enumerate() {
        println!(
            "    [{index}] hash {:#018x} default {} range [{}, {}]",
            param.name_hash, param.default_value, param.min_value, param.max_value
        );
    }

    println!("  wavetables: {}", chunk.wavetables.len());
    for (table, sample) in chunk.wavetables.iter().zip(&chunk.samples) {
        println!(
            "    hash {:#018x}: {} frames, {}ch, {}-bit, loop {}..{}",
            table.name_hash,
            sample.frames(),
            table.channel_count,
            table.bit_depth,
            table.loop_start,
            table.loop_end,
        );
    }

    println!("  streams: {}", chunk.streams.len());
    for stream in &chunk.streams {
        println!(
            "    hash {:#018x}: {} samples in {} chunks of {}, {} Hz, {}ch, {}",
            stream.name_hash,
            stream.total_samples,
            stream.chunk_count,
            stream.chunk_size,
            stream.sample_rate,
            stream.channel_count,
            if stream.format == 1 {
                "float".to_string()
            } else {
                format!("{}-bit PCM", stream.bit_depth)
            },
        );
    }

    Ok(())
}

fn type_name(kind: Option<NodeType>) -> &'static str {
    match kind {
        Some(NodeType::Oscillator) => "Oscillator",
        Some(NodeType::Amplifier) => "Amplifier",
        Some(NodeType::Parameter) => "Parameter",
        Some(NodeType::Mixer) => "Mixer",
        Some(NodeType::Envelope) => "Envelope",
        Some(NodeType::Filter) => "Filter",
        Some(NodeType::Distortion) => "Distortion",
        Some(NodeType::Sampler) => "Sampler",
        Some(NodeType::StreamingSampler) => "StreamingSampler",
        None => "Reserved",
    }
}
