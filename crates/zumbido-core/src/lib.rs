//! zumbido core — node-graph audio engine for TAF `AUDI` chunks.
//!
//! An `AUDI` chunk describes a directed graph of synthesis and effect
//! nodes plus the samples they play. This crate decodes the chunk, owns
//! the in-memory graph, and renders it from a pull-model audio callback:
//!
//! - [`decode`] / [`ChunkBuilder`] — the binary format, both directions
//! - [`Processor`] — load a chunk, write parameters from any thread, pull
//!   interleaved blocks with `process(out, frames, channels)`
//! - [`StreamSource`] — the seam through which disk-backed samples arrive
//!   (the file/prefetch backend lives in `zumbido-io`)
//!
//! # Example
//!
//! ```rust
//! use zumbido_core::{ChunkBuilder, NodeType, Processor};
//!
//! let mut patch = ChunkBuilder::new(48_000);
//! let osc = patch.node(NodeType::Oscillator, 1, 1);
//! patch.param("frequency", 220.0, 20.0, 20_000.0);
//! let amp = patch.node(NodeType::Amplifier, 2, 1);
//! patch.param("amplitude", 0.5, 0.0, 1.0);
//! patch.connect(osc, 0, amp, 0, 1.0);
//!
//! let processor = Processor::new(48_000);
//! processor.load(&patch.build()).unwrap();
//!
//! let mut block = vec![0.0f32; 256 * 2];
//! processor.process(&mut block, 256, 2);
//! ```
//!
//! # Threading
//!
//! One audio thread drives `process()`; it is the sole mutator of node
//! scratch state. Control threads may call `set_parameter()` at any time —
//! writes are relaxed atomic scalars with monotonic visibility to the next
//! block. `load()` swaps the whole graph and may race a running callback
//! only on the brief engine mutex.

pub mod builder;
pub mod chunk;
mod graph;
pub mod hash;
mod nodes;
mod param;
pub mod processor;
pub mod shape;
pub mod stream;

pub use builder::ChunkBuilder;
pub use chunk::{
    Connection, DecodeError, DecodedChunk, Node, NodeType, Parameter, SampleData, StreamingAudio,
    WaveTable, decode,
};
pub use hash::{fnv1a_hash, keys};
pub use processor::Processor;
pub use stream::StreamSource;
