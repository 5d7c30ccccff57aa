//! Binary `AUDI` chunk format and decoder.
//!
//! An `AUDI` chunk is the audio payload of a TAF asset: a packed
//! little-endian header followed by the node, connection, pattern,
//! wavetable, parameter, and streaming-descriptor arrays, then raw sample
//! payloads addressed by absolute offsets from the chunk start.
//!
//! [`decode`] validates arity and payload bounds up front and converts
//! embedded sample payloads to normalized `f32` eagerly. Streaming payloads
//! are described but never touched at load time.

/// Size of the packed chunk header in bytes.
pub const HEADER_SIZE: usize = 28;
/// Size of one packed node record (six `u32` fields plus reserved padding).
pub const NODE_RECORD_SIZE: usize = 32;
/// Size of one packed connection record.
pub const CONNECTION_RECORD_SIZE: usize = 20;
/// Size of one pattern record. Patterns are reserved and skipped on read.
pub const PATTERN_RECORD_SIZE: usize = 16;
/// Size of one packed wavetable descriptor.
pub const WAVETABLE_RECORD_SIZE: usize = 44;
/// Size of one packed parameter record.
pub const PARAMETER_RECORD_SIZE: usize = 20;
/// Size of one packed streaming-audio descriptor.
pub const STREAMING_RECORD_SIZE: usize = 44;

/// Sample rate substituted when a chunk declares 0 Hz.
pub const FALLBACK_SAMPLE_RATE: u32 = 48_000;

/// Errors produced while decoding an `AUDI` chunk.
///
/// All decode errors are fatal for a load; the processor's prior graph is
/// left untouched because decoding completes before any state is replaced.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The byte slice cannot hold the fixed header.
    #[error("audio chunk too small: {size} bytes, header needs {HEADER_SIZE}")]
    TooSmall {
        /// Length of the rejected chunk.
        size: usize,
    },

    /// A declared record count would push the read cursor past the end.
    #[error("{array} array ({count} records) overruns the chunk")]
    BadArity {
        /// Which array overran.
        array: &'static str,
        /// The count the header declared.
        count: u32,
    },

    /// A wavetable payload range escapes the chunk.
    #[error("wavetable payload out of bounds: offset {offset} + {size} bytes > chunk size {chunk}")]
    BadPayload {
        /// Absolute payload offset from chunk start.
        offset: u64,
        /// Payload size in bytes.
        size: u64,
        /// Total chunk size.
        chunk: usize,
    },

    /// A wavetable declares a bit depth the format does not define.
    #[error("unknown wavetable bit depth: {0}")]
    UnknownBitDepth(u32),
}

/// The kind of DSP work a node performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum NodeType {
    /// Waveform generator (sine, square, saw, triangle, noise).
    Oscillator = 0,
    /// Gain stage with an optional modulation input; also the graph sink.
    Amplifier = 1,
    /// Emits a parameter value as a signal.
    Parameter = 2,
    /// Sums inputs with per-input and master gains.
    Mixer = 3,
    /// ADSR envelope generator driven by a gate input.
    Envelope = 4,
    /// Biquad filter (lowpass, highpass, bandpass).
    Filter = 5,
    /// Waveshaping distortion with six shaper variants.
    Distortion = 6,
    /// Plays an embedded wavetable sample.
    Sampler = 7,
    /// Plays a disk-streamed sample through a [`StreamSource`](crate::StreamSource).
    StreamingSampler = 8,
}

impl NodeType {
    /// Maps a raw chunk field to a node type, `None` for reserved values.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Oscillator,
            1 => Self::Amplifier,
            2 => Self::Parameter,
            3 => Self::Mixer,
            4 => Self::Envelope,
            5 => Self::Filter,
            6 => Self::Distortion,
            7 => Self::Sampler,
            8 => Self::StreamingSampler,
            _ => return None,
        })
    }
}

/// One node record: identity, kind, arity, and its private parameter slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    /// Stable non-zero identifier, unique within the chunk.
    pub id: u32,
    /// Raw node type field. Reserved values produce a silent node.
    pub node_type: u32,
    /// Number of signal inputs.
    pub input_count: u32,
    /// Number of signal outputs.
    pub output_count: u32,
    /// Start of the node's private window into the parameter array.
    pub param_offset: u32,
    /// Length of the private parameter window.
    pub param_count: u32,
}

impl Node {
    /// The decoded node type, `None` when the raw field is reserved.
    #[must_use]
    pub fn kind(&self) -> Option<NodeType> {
        NodeType::from_raw(self.node_type)
    }
}

/// One edge of the graph. Multiple connections may target the same
/// `(dest_node, dest_input)`; their contributions sum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Connection {
    /// Source node id.
    pub source_node: u32,
    /// Source output index (the engine is single-output; always 0 today).
    pub source_output: u32,
    /// Destination node id.
    pub dest_node: u32,
    /// Destination input index.
    pub dest_input: u32,
    /// Multiplicative gain applied as the signal enters the input.
    pub strength: f32,
}

/// One parameter record. `name_hash` is FNV-1a/64 of the ASCII name.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parameter {
    /// FNV-1a/64 of the parameter name.
    pub name_hash: u64,
    /// Initial value installed at load.
    pub default_value: f32,
    /// Lower clamp bound for runtime writes.
    pub min_value: f32,
    /// Upper clamp bound for runtime writes.
    pub max_value: f32,
}

/// One embedded-sample descriptor. The payload is decoded eagerly at load.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveTable {
    /// FNV-1a/64 of the sample name.
    pub name_hash: u64,
    /// 1 (mono) or 2 (stereo interleaved).
    pub channel_count: u32,
    /// Base frequency used for pitch shifting.
    pub base_frequency: f32,
    /// Loop start point in frames.
    pub loop_start: u32,
    /// Loop end point in frames. A loop exists when `loop_end > loop_start`.
    pub loop_end: u32,
    /// Payload bit depth: 8, 16, 24, or 32 (float).
    pub bit_depth: u32,
    /// Absolute payload offset from chunk start.
    pub data_offset: u64,
    /// Payload size in bytes.
    pub data_size: u64,
}

/// One streaming-audio descriptor: a payload too large to load eagerly,
/// addressed inside some external file bound later via a stream source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamingAudio {
    /// FNV-1a/64 of the stream name.
    pub name_hash: u64,
    /// Payload offset inside the backing file.
    pub data_offset: u64,
    /// Total sample frames in the stream.
    pub total_samples: u32,
    /// Frames per streaming chunk.
    pub chunk_size: u32,
    /// Source sample rate in Hz.
    pub sample_rate: u32,
    /// 1 (mono) or 2 (stereo interleaved).
    pub channel_count: u32,
    /// Payload bit depth for PCM formats.
    pub bit_depth: u32,
    /// 1 for IEEE float payloads, anything else is integer PCM.
    pub format: u32,
    /// Number of chunks in the payload.
    pub chunk_count: u32,
}

impl StreamingAudio {
    /// Number of chunks required to cover `total_samples`.
    #[must_use]
    pub fn chunks_needed(&self) -> u32 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.total_samples.div_ceil(self.chunk_size)
    }
}

/// An embedded sample decoded to normalized `f32`.
#[derive(Clone, Debug, Default)]
pub struct SampleData {
    /// Normalized samples, interleaved when stereo.
    pub data: Vec<f32>,
    /// 1 or 2.
    pub channel_count: u32,
    /// Source sample rate (the chunk rate; never 0 after load).
    pub sample_rate: u32,
    /// Base frequency for pitch shifting.
    pub base_frequency: f32,
    /// Loop start point in frames.
    pub loop_start: u32,
    /// Loop end point in frames.
    pub loop_end: u32,
    /// Whether the loop window is non-empty.
    pub has_loop: bool,
}

impl SampleData {
    /// Sample frames available (samples per channel).
    #[must_use]
    pub fn frames(&self) -> usize {
        self.data.len() / self.channel_count.max(1) as usize
    }
}

/// A fully decoded `AUDI` chunk, ready to become a processor graph.
#[derive(Debug, Default)]
pub struct DecodedChunk {
    /// Chunk sample rate; [`FALLBACK_SAMPLE_RATE`] substituted for 0.
    pub sample_rate: u32,
    /// Node records in file order.
    pub nodes: Vec<Node>,
    /// Connection records in file order.
    pub connections: Vec<Connection>,
    /// Parameter records in file order (slice positions are indices here).
    pub parameters: Vec<Parameter>,
    /// Wavetable descriptors in file order.
    pub wavetables: Vec<WaveTable>,
    /// Decoded wavetable payloads, parallel to `wavetables`.
    pub samples: Vec<SampleData>,
    /// Streaming descriptors in file order.
    pub streams: Vec<StreamingAudio>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Checks that `count` records of `record_size` bytes fit from the cursor.
    fn need_array(
        &self,
        count: u32,
        record_size: usize,
        array: &'static str,
    ) -> Result<(), DecodeError> {
        let needed = (count as usize).checked_mul(record_size);
        let fits = needed
            .and_then(|n| self.pos.checked_add(n))
            .is_some_and(|end| end <= self.bytes.len());
        if fits {
            Ok(())
        } else {
            Err(DecodeError::BadArity { array, count })
        }
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn u32(&mut self) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.bytes[self.pos..self.pos + 4]);
        self.pos += 4;
        u32::from_le_bytes(b)
    }

    fn u64(&mut self) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.bytes[self.pos..self.pos + 8]);
        self.pos += 8;
        u64::from_le_bytes(b)
    }

    fn f32(&mut self) -> f32 {
        f32::from_bits(self.u32())
    }
}

/// Decodes an `AUDI` chunk byte blob into its in-memory model.
///
/// Validation happens before anything is returned: a header that does not
/// fit, an array that overruns the chunk, a wavetable payload outside the
/// chunk, or an unknown bit depth all fail the whole decode.
pub fn decode(bytes: &[u8]) -> Result<DecodedChunk, DecodeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DecodeError::TooSmall { size: bytes.len() });
    }

    let mut r = Reader::new(bytes);
    let node_count = r.u32();
    let connection_count = r.u32();
    let parameter_count = r.u32();
    let pattern_count = r.u32();
    let sample_count = r.u32();
    let streaming_count = r.u32();
    let mut sample_rate = r.u32();

    if sample_rate == 0 {
        tracing::warn!("chunk declares 0 Hz sample rate, substituting {FALLBACK_SAMPLE_RATE}");
        sample_rate = FALLBACK_SAMPLE_RATE;
    }

    r.need_array(node_count, NODE_RECORD_SIZE, "node")?;
    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        nodes.push(Node {
            id: r.u32(),
            node_type: r.u32(),
            input_count: r.u32(),
            output_count: r.u32(),
            param_offset: r.u32(),
            param_count: r.u32(),
        });
        r.skip(NODE_RECORD_SIZE - 24); // reserved padding
    }

    r.need_array(connection_count, CONNECTION_RECORD_SIZE, "connection")?;
    let mut connections = Vec::with_capacity(connection_count as usize);
    for _ in 0..connection_count {
        connections.push(Connection {
            source_node: r.u32(),
            source_output: r.u32(),
            dest_node: r.u32(),
            dest_input: r.u32(),
            strength: r.f32(),
        });
    }

    // Patterns are reserved: validated for size, never interpreted.
    r.need_array(pattern_count, PATTERN_RECORD_SIZE, "pattern")?;
    r.skip(pattern_count as usize * PATTERN_RECORD_SIZE);

    r.need_array(sample_count, WAVETABLE_RECORD_SIZE, "wavetable")?;
    let mut wavetables = Vec::with_capacity(sample_count as usize);
    for _ in 0..sample_count {
        wavetables.push(WaveTable {
            name_hash: r.u64(),
            channel_count: r.u32(),
            base_frequency: r.f32(),
            loop_start: r.u32(),
            loop_end: r.u32(),
            bit_depth: r.u32(),
            data_offset: r.u64(),
            data_size: r.u64(),
        });
    }

    r.need_array(parameter_count, PARAMETER_RECORD_SIZE, "parameter")?;
    let mut parameters = Vec::with_capacity(parameter_count as usize);
    for _ in 0..parameter_count {
        parameters.push(Parameter {
            name_hash: r.u64(),
            default_value: r.f32(),
            min_value: r.f32(),
            max_value: r.f32(),
        });
    }

    r.need_array(streaming_count, STREAMING_RECORD_SIZE, "streaming")?;
    let mut streams = Vec::with_capacity(streaming_count as usize);
    for _ in 0..streaming_count {
        streams.push(StreamingAudio {
            name_hash: r.u64(),
            data_offset: r.u64(),
            total_samples: r.u32(),
            chunk_size: r.u32(),
            sample_rate: r.u32(),
            channel_count: r.u32(),
            bit_depth: r.u32(),
            format: r.u32(),
            chunk_count: r.u32(),
        });
    }

    let mut samples = Vec::with_capacity(wavetables.len());
    for table in &wavetables {
        samples.push(decode_wavetable(bytes, table, sample_rate)?);
    }

    tracing::debug!(
        nodes = nodes.len(),
        connections = connections.len(),
        parameters = parameters.len(),
        wavetables = wavetables.len(),
        streams = streams.len(),
        sample_rate,
        "decoded audio chunk"
    );

    Ok(DecodedChunk {
        sample_rate,
        nodes,
        connections,
        parameters,
        wavetables,
        samples,
        streams,
    })
}

/// Decodes one wavetable payload to normalized `f32`.
fn decode_wavetable(
    bytes: &[u8],
    table: &WaveTable,
    sample_rate: u32,
) -> Result<SampleData, DecodeError> {
    let end = table.data_offset.checked_add(table.data_size);
    if !end.is_some_and(|e| e <= bytes.len() as u64) {
        return Err(DecodeError::BadPayload {
            offset: table.data_offset,
            size: table.data_size,
            chunk: bytes.len(),
        });
    }

    let bytes_per = match table.bit_depth {
        8 => 1usize,
        16 => 2,
        24 => 3,
        32 => 4,
        other => return Err(DecodeError::UnknownBitDepth(other)),
    };

    let channels = table.channel_count.max(1);
    let frames = table.data_size as usize / (bytes_per * channels as usize);
    let values = frames * channels as usize;
    let payload = &bytes[table.data_offset as usize..][..values * bytes_per];

    let data = decode_pcm(payload, table.bit_depth, values);

    Ok(SampleData {
        data,
        channel_count: channels,
        sample_rate,
        base_frequency: table.base_frequency,
        loop_start: table.loop_start,
        loop_end: table.loop_end,
        has_loop: table.loop_end > table.loop_start,
    })
}

/// Converts raw little-endian PCM/float bytes to normalized `f32`.
///
/// `bit_depth` must already be validated; `payload` must hold exactly
/// `values` samples. Shared by the eager wavetable path and the streaming
/// backends.
#[must_use]
pub fn decode_pcm(payload: &[u8], bit_depth: u32, values: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(values);
    match bit_depth {
        8 => {
            for &b in payload.iter().take(values) {
                data.push((f32::from(b) - 128.0) / 128.0);
            }
        }
        16 => {
            for raw in payload.chunks_exact(2).take(values) {
                let v = i16::from_le_bytes([raw[0], raw[1]]);
                data.push(f32::from(v) / 32768.0);
            }
        }
        24 => {
            for raw in payload.chunks_exact(3).take(values) {
                let high = if raw[2] & 0x80 != 0 { 0xFF } else { 0x00 };
                let v = i32::from_le_bytes([raw[0], raw[1], raw[2], high]);
                data.push(v as f32 / 8_388_608.0);
            }
        }
        32 => {
            for raw in payload.chunks_exact(4).take(values) {
                data.push(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]));
            }
        }
        _ => data.resize(values, 0.0),
    }
    data
}
