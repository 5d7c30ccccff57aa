//! Disk streaming backend for the zumbido audio engine.
//!
//! Streaming descriptors in an `AUDI` chunk reference payloads too large
//! to load eagerly. This crate supplies the file-backed
//! [`StreamSource`](zumbido_core::StreamSource) implementation:
//!
//! - [`FileStreamSource`] reads one chunk at a time from a payload file,
//!   decoding PCM/float to normalized `f32`,
//! - [`Prefetcher`] runs a single background worker that loads upcoming
//!   chunks into a double buffer so the audio thread normally never waits
//!   on the disk,
//! - [`set_file_path`] binds a payload file to a processor's streaming
//!   descriptor in one call.
//!
//! ```rust,no_run
//! use zumbido_core::Processor;
//! use zumbido_io::{Prefetcher, set_file_path};
//!
//! let processor = Processor::new(48_000);
//! # let chunk_bytes: Vec<u8> = Vec::new();
//! processor.load(&chunk_bytes)?;
//!
//! let prefetcher = Prefetcher::new();
//! set_file_path(&processor, 0, "assets/ambience.pcm", &prefetcher)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod prefetch;
mod source;

pub use prefetch::Prefetcher;
pub use source::FileStreamSource;

use std::path::Path;

use zumbido_core::Processor;

/// Errors from the streaming backend.
///
/// These surface only from setup calls. Failures during playback (a file
/// that disappears, a short read) never reach the audio callback — the
/// stream logs once and plays silence.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The processor's loaded chunk has no streaming descriptor at the index.
    #[error("no streaming descriptor at index {0}")]
    NoSuchStream(usize),

    /// The descriptor's payload format cannot be streamed.
    #[error("unsupported streaming payload: {bit_depth}-bit PCM")]
    UnsupportedFormat {
        /// The PCM bit depth the descriptor declared.
        bit_depth: u32,
    },

    /// File open/seek/read failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Binds a payload file to the streaming descriptor at `stream_index`.
///
/// Builds a [`FileStreamSource`] sized from the descriptor the processor
/// decoded, queues the first chunk on the prefetcher so playback can start
/// without a disk hit, and installs the source on the processor. The file
/// itself is opened lazily — a missing file shows up as logged silence at
/// play time, and a later `set_file_path` with a good path recovers.
pub fn set_file_path(
    processor: &Processor,
    stream_index: usize,
    path: impl AsRef<Path>,
    prefetcher: &Prefetcher,
) -> Result<(), StreamError> {
    let desc = processor
        .stream_descriptor(stream_index)
        .ok_or(StreamError::NoSuchStream(stream_index))?;

    let mut source = FileStreamSource::new(&desc, path.as_ref(), prefetcher)?;
    use zumbido_core::StreamSource as _;
    source.prefetch(0);

    processor.set_stream_source(stream_index, Box::new(source));
    tracing::debug!(
        stream_index,
        path = %path.as_ref().display(),
        "bound streaming payload file"
    );
    Ok(())
}
