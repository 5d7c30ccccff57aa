//! The audio processor: one loaded graph plus everything needed to run it
//! from an audio callback.
//!
//! `process()` and `load()` serialize on the engine mutex; parameter
//! writes go through the lock-free table and become visible to the next
//! block. Within one `process()` call nodes run in dependency order, so a
//! node always observes outputs produced earlier in the same call.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::chunk::{self, DecodeError, FALLBACK_SAMPLE_RATE, Node, StreamingAudio};
use crate::graph::Graph;
use crate::hash::keys;
use crate::nodes::{InputScratch, KernelCtx, KernelEnv, Xorshift32};
use crate::param::{ParamStore, ParamTable};
use crate::stream::StreamSource;

/// Mutable engine state behind the processor's mutex.
struct Engine {
    graph: Graph,
    scratch: InputScratch,
    rng: Xorshift32,
    current_time: f32,
}

/// A node-graph audio processor for one `AUDI` chunk.
///
/// Construct with [`new`](Self::new), feed it a chunk with
/// [`load`](Self::load), then pull interleaved audio with
/// [`process`](Self::process) from the host's audio callback. Parameters
/// may be written from any thread at any time.
pub struct Processor {
    sample_rate: u32,
    engine: Mutex<Engine>,
    params: ParamTable,
    time_bits: AtomicU32,
}

impl Processor {
    /// Creates an empty processor. A `sample_rate` of 0 falls back to
    /// 48 kHz. Until a chunk is loaded, `process()` emits silence.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = if sample_rate == 0 {
            FALLBACK_SAMPLE_RATE
        } else {
            sample_rate
        };
        Self {
            sample_rate,
            engine: Mutex::new(Engine {
                graph: Graph::default(),
                scratch: InputScratch::default(),
                rng: Xorshift32::from_instance_counter(),
                current_time: 0.0,
            }),
            params: ParamTable::default(),
            time_bits: AtomicU32::new(0),
        }
    }

    /// The engine sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decodes `bytes` and atomically replaces the current graph.
    ///
    /// On error nothing changes: decoding completes before any state is
    /// swapped. On success all prior nodes, connections, parameters, and
    /// samples are gone and `current_time` restarts at zero.
    pub fn load(&self, bytes: &[u8]) -> Result<(), DecodeError> {
        let decoded = chunk::decode(bytes)?;
        let params = ParamStore::from_records(&decoded.parameters);
        let stats = (
            decoded.nodes.len(),
            decoded.connections.len(),
            decoded.parameters.len(),
            decoded.samples.len(),
            decoded.streams.len(),
        );
        let graph = Graph::from_chunk(decoded);

        // The parameter table and the engine are swapped under separate
        // locks, params first; the two locks are never held together.
        self.params.replace(params);
        {
            let mut engine = self.lock_engine();
            engine.graph = graph;
            engine.current_time = 0.0;
        }
        self.time_bits.store(0.0f32.to_bits(), Ordering::Relaxed);

        tracing::info!(
            nodes = stats.0,
            connections = stats.1,
            parameters = stats.2,
            samples = stats.3,
            streams = stats.4,
            "loaded audio chunk"
        );
        Ok(())
    }

    /// Writes a parameter by name hash, clamped into its declared range.
    /// Unknown hashes are ignored.
    pub fn set_parameter(&self, name_hash: u64, value: f32) {
        self.params.read().set(name_hash, value);
    }

    /// Reads a parameter's current value through the global hash map.
    #[must_use]
    pub fn parameter(&self, name_hash: u64) -> Option<f32> {
        self.params.read().global(name_hash)
    }

    /// The streaming descriptor at `stream_index`, if the loaded chunk has
    /// one. Stream backends use this to size their reads.
    #[must_use]
    pub fn stream_descriptor(&self, stream_index: usize) -> Option<StreamingAudio> {
        self.lock_engine()
            .graph
            .streams
            .get(stream_index)
            .map(|slot| slot.desc)
    }

    /// Binds a chunk source to the streaming descriptor at `stream_index`.
    /// Until a source is bound the stream plays silence.
    pub fn set_stream_source(&self, stream_index: usize, source: Box<dyn StreamSource>) {
        let mut engine = self.lock_engine();
        match engine.graph.streams.get_mut(stream_index) {
            Some(slot) => slot.bind(source),
            None => tracing::warn!(stream_index, "no such streaming descriptor"),
        }
    }

    /// Absolute time in seconds advanced by `process()` calls.
    #[must_use]
    pub fn current_time(&self) -> f32 {
        f32::from_bits(self.time_bits.load(Ordering::Relaxed))
    }

    /// Renders one block: `frames × channels` interleaved samples into
    /// `out`. Every output channel carries the same mono sink signal.
    ///
    /// `out` must hold at least `frames × channels` values; exactly that
    /// many are written.
    pub fn process(&self, out: &mut [f32], frames: u32, channels: u32) {
        let frames = frames as usize;
        let channels = channels as usize;
        let needed = frames * channels;
        debug_assert!(out.len() >= needed, "output buffer too small");
        out[..needed].fill(0.0);

        let store = self.params.read();
        let mut engine = self.lock_engine();
        let engine = &mut *engine;
        let sample_rate = self.sample_rate as f32;

        for position in 0..engine.graph.order.len() {
            let slot_index = engine.graph.order[position];
            let node = engine.graph.nodes[slot_index].node;

            gather_inputs(
                &engine.graph,
                &node,
                &mut engine.scratch,
                frames,
            );

            let Engine {
                graph,
                scratch,
                rng,
                current_time,
            } = &mut *engine;
            let crate::graph::Graph {
                nodes,
                samples,
                streams,
                ..
            } = graph;

            let slot = &mut nodes[slot_index];
            if slot.output.len() < frames {
                slot.output.resize(frames, 0.0);
            }

            let ctx = KernelCtx {
                frames,
                sample_rate,
                time: *current_time,
                params: &store,
                inputs: scratch,
            };
            let mut env = KernelEnv {
                rng,
                samples: samples.as_slice(),
                streams: streams.as_mut_slice(),
            };
            slot.kernel
                .process(&node, &ctx, &mut env, &mut slot.output[..frames]);
        }

        if let Some(sink) = engine.graph.sink {
            let buffer = &engine.graph.nodes[sink].output;
            for frame in 0..frames {
                let sample = buffer.get(frame).copied().unwrap_or(0.0);
                for ch in 0..channels {
                    out[frame * channels + ch] = sample;
                }
            }
        }

        engine.current_time += frames as f32 / sample_rate;
        self.time_bits
            .store(engine.current_time.to_bits(), Ordering::Relaxed);
        store.set_raw(keys::TIME, engine.current_time);
    }

    fn lock_engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sums every connection targeting `node` into the scratch rows:
/// `row[input][frame] += source.output[frame] * strength`.
///
/// Rows cover the node's declared inputs and any higher input index a
/// connection actually targets.
fn gather_inputs(graph: &Graph, node: &Node, scratch: &mut InputScratch, frames: usize) {
    let mut rows = node.input_count as usize;
    for conn in &graph.connections {
        if conn.dest_node == node.id {
            rows = rows.max(conn.dest_input as usize + 1);
        }
    }
    scratch.prepare(rows, frames);

    for conn in &graph.connections {
        if conn.dest_node != node.id {
            continue;
        }
        let Some(&source) = graph.index.get(&conn.source_node) else {
            continue;
        };
        let output = &graph.nodes[source].output;
        let len = frames.min(output.len());
        scratch.accumulate(conn.dest_input as usize, &output[..len], conn.strength);
    }
}
