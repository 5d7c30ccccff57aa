//! Stream-source seam for disk-backed samples.
//!
//! The streaming sampler kernel consumes audio through [`StreamSource`], a
//! backend trait that hides where chunks come from. The file-backed
//! implementation with background prefetch lives in `zumbido-io`; tests use
//! in-memory sources. With no source bound, a stream plays silence.

use crate::chunk::StreamingAudio;

/// Supplies decoded sample chunks for one streaming descriptor.
///
/// Chunks are interleaved `f32`, `chunk_size × channel_count` values each
/// (the final chunk of a stream may be zero-padded by the backend).
pub trait StreamSource: Send {
    /// Produces chunk `index` into `out`, blocking if it is not resident.
    ///
    /// Returns `false` when the chunk cannot be provided (missing file,
    /// unsupported format); the caller emits silence.
    fn fetch(&mut self, index: u32, out: &mut Vec<f32>) -> bool;

    /// Hints that chunk `index` will be needed soon. Backends without a
    /// prefetch path may ignore this.
    fn prefetch(&mut self, index: u32);
}

/// Runtime state of one streaming descriptor: the descriptor itself, the
/// bound source, and the chunk currently resident on the audio thread.
pub(crate) struct StreamSlot {
    pub desc: StreamingAudio,
    pub source: Option<Box<dyn StreamSource>>,
    /// Chunk currently being played. Owned by the audio thread outright.
    pub buffer: Vec<f32>,
    pub current_chunk: u32,
    /// Set once the next chunk's prefetch has been requested.
    pub prefetch_requested: bool,
    /// Set after the first failed fetch so silence is logged only once.
    pub warned: bool,
}

impl StreamSlot {
    pub fn new(desc: StreamingAudio) -> Self {
        Self {
            desc,
            source: None,
            buffer: Vec::new(),
            current_chunk: 0,
            prefetch_requested: false,
            warned: false,
        }
    }

    /// Binds a source and resets playback-related chunk state.
    pub fn bind(&mut self, source: Box<dyn StreamSource>) {
        self.source = Some(source);
        self.buffer.clear();
        self.current_chunk = 0;
        self.prefetch_requested = false;
        self.warned = false;
    }

    /// Makes `chunk` the resident chunk, via the bound source.
    ///
    /// On failure the buffer is zeroed so playback continues in silence.
    pub fn flip_to(&mut self, chunk: u32) {
        let values = self.desc.chunk_size as usize * self.desc.channel_count.max(1) as usize;
        let ok = match self.source.as_mut() {
            Some(source) => source.fetch(chunk, &mut self.buffer),
            None => false,
        };
        if !ok {
            if !self.warned {
                tracing::warn!(
                    name_hash = self.desc.name_hash,
                    chunk,
                    "streaming chunk unavailable, emitting silence"
                );
                self.warned = true;
            }
            self.buffer.clear();
            self.buffer.resize(values, 0.0);
        } else if self.buffer.len() < values {
            self.buffer.resize(values, 0.0);
        }
        self.current_chunk = chunk;
        self.prefetch_requested = false;
    }

    /// Queues a prefetch for `chunk` (at most once per resident chunk).
    pub fn request_prefetch(&mut self, chunk: u32) {
        if self.prefetch_requested {
            return;
        }
        if let Some(source) = self.source.as_mut() {
            source.prefetch(chunk);
            self.prefetch_requested = true;
        }
    }
}
