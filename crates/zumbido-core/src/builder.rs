//! Programmatic `AUDI` chunk authoring.
//!
//! [`ChunkBuilder`] is the writer dual of [`decode`](crate::decode): it
//! assembles nodes, connections, parameters, wavetables, and streaming
//! descriptors, then emits the packed little-endian chunk. Embedded sample
//! payloads are written as 32-bit float after the record arrays.
//!
//! Node ids are assigned sequentially from 1. Parameters added with
//! [`param`](ChunkBuilder::param) extend the most recently added node's
//! private slice; [`global_param`](ChunkBuilder::global_param) appends a
//! parameter owned by no node (reachable only through the global hash map).

use crate::chunk::{
    CONNECTION_RECORD_SIZE, Connection, HEADER_SIZE, Node, NODE_RECORD_SIZE, NodeType,
    PARAMETER_RECORD_SIZE, Parameter, STREAMING_RECORD_SIZE, StreamingAudio, WAVETABLE_RECORD_SIZE,
    WaveTable,
};
use crate::hash::fnv1a_hash;

/// Builds packed `AUDI` chunks.
pub struct ChunkBuilder {
    sample_rate: u32,
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    parameters: Vec<Parameter>,
    wavetables: Vec<WaveTable>,
    payloads: Vec<Vec<f32>>,
    streams: Vec<StreamingAudio>,
    next_id: u32,
}

impl ChunkBuilder {
    /// Creates an empty builder targeting the given sample rate.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            nodes: Vec::new(),
            connections: Vec::new(),
            parameters: Vec::new(),
            wavetables: Vec::new(),
            payloads: Vec::new(),
            streams: Vec::new(),
            next_id: 1,
        }
    }

    /// Adds a node and returns its id. Subsequent [`param`](Self::param)
    /// calls extend this node's parameter slice.
    pub fn node(&mut self, kind: NodeType, input_count: u32, output_count: u32) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.push(Node {
            id,
            node_type: kind as u32,
            input_count,
            output_count,
            param_offset: self.parameters.len() as u32,
            param_count: 0,
        });
        id
    }

    /// Appends a parameter to the most recently added node's slice.
    ///
    /// # Panics
    ///
    /// Panics when called before any [`node`](Self::node).
    pub fn param(&mut self, name: &str, default: f32, min: f32, max: f32) -> &mut Self {
        let node = self
            .nodes
            .last_mut()
            .expect("param() requires an open node");
        node.param_count += 1;
        self.parameters.push(Parameter {
            name_hash: fnv1a_hash(name),
            default_value: default,
            min_value: min,
            max_value: max,
        });
        self
    }

    /// Appends a parameter owned by no node.
    pub fn global_param(&mut self, name: &str, default: f32, min: f32, max: f32) -> &mut Self {
        self.parameters.push(Parameter {
            name_hash: fnv1a_hash(name),
            default_value: default,
            min_value: min,
            max_value: max,
        });
        self
    }

    /// Connects `source` output `source_output` to `dest` input `dest_input`.
    pub fn connect(
        &mut self,
        source: u32,
        source_output: u32,
        dest: u32,
        dest_input: u32,
        strength: f32,
    ) -> &mut Self {
        self.connections.push(Connection {
            source_node: source,
            source_output,
            dest_node: dest,
            dest_input,
            strength,
        });
        self
    }

    /// Adds an embedded wavetable with a 32-bit float payload.
    ///
    /// `samples` is interleaved when `channel_count` is 2. Returns the
    /// wavetable index for `sample_index` parameters.
    pub fn wavetable(
        &mut self,
        name: &str,
        channel_count: u32,
        base_frequency: f32,
        loop_start: u32,
        loop_end: u32,
        samples: &[f32],
    ) -> u32 {
        let index = self.wavetables.len() as u32;
        self.wavetables.push(WaveTable {
            name_hash: fnv1a_hash(name),
            channel_count,
            base_frequency,
            loop_start,
            loop_end,
            bit_depth: 32,
            data_offset: 0, // assigned by build()
            data_size: (samples.len() * 4) as u64,
        });
        self.payloads.push(samples.to_vec());
        index
    }

    /// Adds a streaming descriptor referencing an external payload.
    ///
    /// Returns the stream index for `stream_index` parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn stream(
        &mut self,
        name: &str,
        data_offset: u64,
        total_samples: u32,
        chunk_size: u32,
        sample_rate: u32,
        channel_count: u32,
        bit_depth: u32,
        format: u32,
    ) -> u32 {
        let index = self.streams.len() as u32;
        let chunk_count = if chunk_size == 0 {
            0
        } else {
            total_samples.div_ceil(chunk_size)
        };
        self.streams.push(StreamingAudio {
            name_hash: fnv1a_hash(name),
            data_offset,
            total_samples,
            chunk_size,
            sample_rate,
            channel_count,
            bit_depth,
            format,
            chunk_count,
        });
        index
    }

    /// Emits the packed chunk.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let arrays_end = HEADER_SIZE
            + self.nodes.len() * NODE_RECORD_SIZE
            + self.connections.len() * CONNECTION_RECORD_SIZE
            + self.wavetables.len() * WAVETABLE_RECORD_SIZE
            + self.parameters.len() * PARAMETER_RECORD_SIZE
            + self.streams.len() * STREAMING_RECORD_SIZE;

        let payload_bytes: usize = self.payloads.iter().map(|p| p.len() * 4).sum();
        let mut out = Vec::with_capacity(arrays_end + payload_bytes);

        out.extend_from_slice(&(self.nodes.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.connections.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.parameters.len() as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // pattern_count (reserved)
        out.extend_from_slice(&(self.wavetables.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.streams.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());

        for node in &self.nodes {
            out.extend_from_slice(&node.id.to_le_bytes());
            out.extend_from_slice(&node.node_type.to_le_bytes());
            out.extend_from_slice(&node.input_count.to_le_bytes());
            out.extend_from_slice(&node.output_count.to_le_bytes());
            out.extend_from_slice(&node.param_offset.to_le_bytes());
            out.extend_from_slice(&node.param_count.to_le_bytes());
            out.extend_from_slice(&[0u8; NODE_RECORD_SIZE - 24]);
        }

        for conn in &self.connections {
            out.extend_from_slice(&conn.source_node.to_le_bytes());
            out.extend_from_slice(&conn.source_output.to_le_bytes());
            out.extend_from_slice(&conn.dest_node.to_le_bytes());
            out.extend_from_slice(&conn.dest_input.to_le_bytes());
            out.extend_from_slice(&conn.strength.to_le_bytes());
        }

        let mut offset = arrays_end as u64;
        for (table, payload) in self.wavetables.iter().zip(&self.payloads) {
            out.extend_from_slice(&table.name_hash.to_le_bytes());
            out.extend_from_slice(&table.channel_count.to_le_bytes());
            out.extend_from_slice(&table.base_frequency.to_le_bytes());
            out.extend_from_slice(&table.loop_start.to_le_bytes());
            out.extend_from_slice(&table.loop_end.to_le_bytes());
            out.extend_from_slice(&table.bit_depth.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&table.data_size.to_le_bytes());
            offset += (payload.len() * 4) as u64;
        }

        for param in &self.parameters {
            out.extend_from_slice(&param.name_hash.to_le_bytes());
            out.extend_from_slice(&param.default_value.to_le_bytes());
            out.extend_from_slice(&param.min_value.to_le_bytes());
            out.extend_from_slice(&param.max_value.to_le_bytes());
        }

        for stream in &self.streams {
            out.extend_from_slice(&stream.name_hash.to_le_bytes());
            out.extend_from_slice(&stream.data_offset.to_le_bytes());
            out.extend_from_slice(&stream.total_samples.to_le_bytes());
            out.extend_from_slice(&stream.chunk_size.to_le_bytes());
            out.extend_from_slice(&stream.sample_rate.to_le_bytes());
            out.extend_from_slice(&stream.channel_count.to_le_bytes());
            out.extend_from_slice(&stream.bit_depth.to_le_bytes());
            out.extend_from_slice(&stream.format.to_le_bytes());
            out.extend_from_slice(&stream.chunk_count.to_le_bytes());
        }

        for payload in &self.payloads {
            for &sample in payload {
                out.extend_from_slice(&sample.to_le_bytes());
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::decode;

    #[test]
    fn round_trips_records() {
        let mut b = ChunkBuilder::new(44_100);
        let osc = b.node(NodeType::Oscillator, 1, 1);
        b.param("frequency", 440.0, 20.0, 20_000.0)
            .param("waveform", 0.0, 0.0, 4.0);
        let amp = b.node(NodeType::Amplifier, 2, 1);
        b.param("amplitude", 0.8, 0.0, 1.0);
        b.global_param("gate", 0.0, 0.0, 1.0);
        b.connect(osc, 0, amp, 0, 1.0);
        let wt = b.wavetable("tick", 1, 440.0, 2, 6, &[0.0, 0.5, 1.0, 0.5]);
        let st = b.stream("bed", 128, 96_000, 1024, 48_000, 2, 16, 0);

        let chunk = decode(&b.build()).unwrap();

        assert_eq!(chunk.sample_rate, 44_100);
        assert_eq!(chunk.nodes.len(), 2);
        assert_eq!(chunk.nodes[0].id, osc);
        assert_eq!(chunk.nodes[0].kind(), Some(NodeType::Oscillator));
        assert_eq!(chunk.nodes[0].param_offset, 0);
        assert_eq!(chunk.nodes[0].param_count, 2);
        assert_eq!(chunk.nodes[1].id, amp);
        assert_eq!(chunk.nodes[1].param_offset, 2);
        assert_eq!(chunk.nodes[1].param_count, 1);

        assert_eq!(chunk.connections.len(), 1);
        assert_eq!(chunk.connections[0].source_node, osc);
        assert_eq!(chunk.connections[0].dest_node, amp);
        assert_eq!(chunk.connections[0].strength, 1.0);

        assert_eq!(chunk.parameters.len(), 4);
        assert_eq!(chunk.parameters[0].name_hash, fnv1a_hash("frequency"));
        assert_eq!(chunk.parameters[3].name_hash, fnv1a_hash("gate"));

        assert_eq!(chunk.wavetables.len(), 1);
        assert_eq!(wt, 0);
        assert_eq!(chunk.wavetables[0].loop_start, 2);
        assert_eq!(chunk.wavetables[0].loop_end, 6);
        assert_eq!(chunk.samples[0].data, vec![0.0, 0.5, 1.0, 0.5]);
        assert!(chunk.samples[0].has_loop);

        assert_eq!(st, 0);
        assert_eq!(chunk.streams.len(), 1);
        assert_eq!(chunk.streams[0].data_offset, 128);
        assert_eq!(chunk.streams[0].chunk_size, 1024);
        assert_eq!(chunk.streams[0].chunk_count, 94);
        assert_eq!(chunk.streams[0].channel_count, 2);
    }

    #[test]
    fn payload_offsets_follow_the_arrays() {
        let mut b = ChunkBuilder::new(48_000);
        b.wavetable("a", 1, 0.0, 0, 0, &[1.0, 2.0]);
        b.wavetable("b", 1, 0.0, 0, 0, &[3.0]);
        let bytes = b.build();
        let chunk = decode(&bytes).unwrap();
        let first = chunk.wavetables[0].data_offset;
        let second = chunk.wavetables[1].data_offset;
        assert_eq!(second, first + 8);
        assert_eq!(chunk.samples[0].data, vec![1.0, 2.0]);
        assert_eq!(chunk.samples[1].data, vec![3.0]);
        assert_eq!(bytes.len() as u64, second + 4);
    }
}
