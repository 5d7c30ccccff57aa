//! `zumbido render` - offline-render a chunk to a WAV file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use zumbido_core::{Processor, keys};
use zumbido_io::{Prefetcher, set_file_path};
use zumbido_voice::PolyphonicProcessor;

/// Frames rendered per block, matching a typical callback size.
const BLOCK_FRAMES: u32 = 256;

/// Arguments for the `render` subcommand.
#[derive(Args)]
pub struct RenderArgs {
    /// Path to the AUDI chunk file
    pub chunk: PathBuf,

    /// Output WAV path
    #[arg(short, long, default_value = "out.wav")]
    pub out: PathBuf,

    /// Duration to render in seconds
    #[arg(long, default_value_t = 2.0)]
    pub seconds: f32,

    /// Engine sample rate in Hz
    #[arg(long, default_value_t = 48_000)]
    pub rate: u32,

    /// Output channel count
    #[arg(long, default_value_t = 2)]
    pub channels: u32,

    /// Render through the 16-voice polyphonic processor
    #[arg(long)]
    pub poly: bool,

    /// Seconds to hold the gate open (polyphonic renders only)
    #[arg(long, default_value_t = 0.5)]
    pub gate_hold: f32,

    /// Streaming payload file, bound to stream index 0
    #[arg(long)]
    pub stream_file: Option<PathBuf>,
}

pub fn run(args: &RenderArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.chunk)
        .with_context(|| format!("reading {}", args.chunk.display()))?;
    tracing::debug!(chunk = %args.chunk.display(), bytes = bytes.len(), poly = args.poly, "rendering");

    let total_frames = (args.seconds * args.rate as f32) as u64;
    let spec = hound::WavSpec {
        channels: args.channels as u16,
        sample_rate: args.rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&args.out, spec)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let prefetcher = Prefetcher::new();
    let mut block = vec![0.0f32; BLOCK_FRAMES as usize * args.channels as usize];

    if args.poly {
        let poly = PolyphonicProcessor::new(args.rate);
        poly.load(&bytes).context("loading chunk into voice pool")?;
        if let Some(stream_file) = &args.stream_file {
            poly.set_file_path(0, stream_file, &prefetcher)
                .context("binding streaming payload")?;
        }

        poly.set_parameter(keys::GATE, 1.0);
        let mut gate_open = true;
        let mut rendered = 0u64;
        while rendered < total_frames {
            if gate_open && rendered as f32 / args.rate as f32 >= args.gate_hold {
                poly.set_parameter(keys::GATE, 0.0);
                gate_open = false;
            }
            let frames = BLOCK_FRAMES.min((total_frames - rendered) as u32);
            poly.process(&mut block, frames, args.channels);
            write_block(&mut writer, &block, frames, args.channels)?;
            rendered += u64::from(frames);
        }
    } else {
        let processor = Processor::new(args.rate);
        processor.load(&bytes).context("loading chunk")?;
        if let Some(stream_file) = &args.stream_file {
            set_file_path(&processor, 0, stream_file, &prefetcher)
                .context("binding streaming payload")?;
        }

        let mut rendered = 0u64;
        while rendered < total_frames {
            let frames = BLOCK_FRAMES.min((total_frames - rendered) as u32);
            processor.process(&mut block, frames, args.channels);
            write_block(&mut writer, &block, frames, args.channels)?;
            rendered += u64::from(frames);
        }
    }

    writer.finalize().context("finalizing WAV")?;
    println!(
        "rendered {:.2}s at {} Hz to {}",
        args.seconds,
        args.rate,
        args.out.display()
    );
    Ok(())
}

fn write_block<W: std::io::Write + std::io::Seek>(
    writer: &mut hound::WavWriter<W>,
    block: &[f32],
    frames: u32,
    channels: u32,
) -> anyhow::Result<()> {
    for &sample in &block[..frames as usize * channels as usize] {
        writer.write_sample(sample)?;
    }
    Ok(())
}
