//! File-backed stream source.
//!
//! One [`FileStreamSource`] serves one streaming descriptor from one
//! payload file. Reads are chunk-granular: seek to
//! `data_offset + chunk · chunk_size · channels · bytes_per_sample`, read
//! one chunk's bytes, decode to `f32`. Short reads zero-fill the
//! remainder, so the tail chunk of a stream is silence-padded.
//!
//! The shared [`StreamJob`] is what the prefetch worker sees: the file
//! handle, the geometry, and the double-buffer slot (`next` +
//! `next_index`/`next_ready` atomics). The audio thread's `fetch` takes
//! the prefetched buffer with a single mutex-guarded swap when it is
//! ready, and falls back to a synchronous read when it is not.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use zumbido_core::chunk::decode_pcm;
use zumbido_core::{StreamSource, StreamingAudio};

use crate::prefetch::{PrefetchHandle, Prefetcher};
use crate::StreamError;

/// IEEE float payload format tag.
const FORMAT_FLOAT: u32 = 1;

/// Shared state between a [`FileStreamSource`] and the prefetch worker.
#[derive(Debug)]
pub(crate) struct StreamJob {
    path: PathBuf,
    data_offset: u64,
    chunk_size: u32,
    channels: u32,
    bit_depth: u32,
    format: u32,
    file: Mutex<Option<File>>,
    next: Mutex<Vec<f32>>,
    next_index: AtomicU32,
    next_ready: AtomicBool,
    /// Set after the first failed read so the worker logs only once.
    pub(crate) failed: AtomicBool,
}

impl StreamJob {
    fn lock_file(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_next(&self) -> MutexGuard<'_, Vec<f32>> {
        self.next.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish_next(&self, index: u32) {
        self.next_index.store(index, Ordering::Release);
        self.next_ready.store(true, Ordering::Release);
    }

    fn bytes_per_sample(&self) -> u64 {
        if self.format == FORMAT_FLOAT {
            4
        } else {
            u64::from(self.bit_depth / 8)
        }
    }

    /// Number of `f32` values in one decoded chunk.
    fn chunk_values(&self) -> usize {
        self.chunk_size as usize * self.channels.max(1) as usize
    }

    /// Reads and decodes chunk `index` into `out`.
    ///
    /// Opens the file lazily and keeps the handle for subsequent reads.
    /// A read past end-of-file yields fewer bytes; the rest of the chunk
    /// decodes as silence.
    pub(crate) fn read_chunk(&self, index: u32, out: &mut Vec<f32>) -> Result<(), StreamError> {
        let mut guard = self.lock_file();
        let file = match &mut *guard {
            Some(file) => file,
            slot @ None => slot.insert(File::open(&self.path)?),
        };

        let chunk_bytes = u64::from(self.chunk_size) * u64::from(self.channels.max(1)) * self.bytes_per_sample();
        file.seek(SeekFrom::Start(self.data_offset + u64::from(index) * chunk_bytes))?;

        let mut raw = vec![0u8; chunk_bytes as usize];
        read_full(file, &mut raw)?;
        drop(guard);

        let decode_depth = if self.format == FORMAT_FLOAT {
            32
        } else {
            self.bit_depth
        };
        *out = decode_pcm(&raw, decode_depth, self.chunk_values());
        Ok(())
    }
}

/// Reads until `buf` is full or end-of-file; the unread tail stays zeroed.
fn read_full(file: &mut File, buf: &mut [u8]) -> std::io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(())
}

/// File-backed [`StreamSource`] with double-buffered prefetch.
#[derive(Debug)]
pub struct FileStreamSource {
    job: Arc<StreamJob>,
    handle: PrefetchHandle,
    warned: bool,
}

impl FileStreamSource {
    /// Builds a source for `desc` reading from `path`.
    ///
    /// Fails with [`StreamError::UnsupportedFormat`] for PCM depths other
    /// than 16 and 24 — those payloads belong on the embedded-sample path.
    /// The file is not opened until the first read.
    pub fn new(
        desc: &StreamingAudio,
        path: impl AsRef<Path>,
        prefetcher: &Prefetcher,
    ) -> Result<Self, StreamError> {
        if desc.format != FORMAT_FLOAT && !matches!(desc.bit_depth, 16 | 24) {
            return Err(StreamError::UnsupportedFormat {
                bit_depth: desc.bit_depth,
            });
        }

        Ok(Self {
            job: Arc::new(StreamJob {
                path: path.as_ref().to_path_buf(),
                data_offset: desc.data_offset,
                chunk_size: desc.chunk_size,
                channels: desc.channel_count,
                bit_depth: desc.bit_depth,
                format: desc.format,
                file: Mutex::new(None),
                next: Mutex::new(Vec::new()),
                next_index: AtomicU32::new(0),
                next_ready: AtomicBool::new(false),
                failed: AtomicBool::new(false),
            }),
            handle: prefetcher.handle(),
            warned: false,
        })
    }
}

impl StreamSource for FileStreamSource {
    fn fetch(&mut self, index: u32, out: &mut Vec<f32>) -> bool {
        if self.job.next_ready.load(Ordering::Acquire)
            && self.job.next_index.load(Ordering::Acquire) == index
        {
            let mut next = self.job.lock_next();
            std::mem::swap(out, &mut *next);
            self.job.next_ready.store(false, Ordering::Release);
            return true;
        }

        match self.job.read_chunk(index, out) {
            Ok(()) => true,
            Err(error) => {
                if !self.warned {
                    tracing::warn!(
                        path = %self.job.path.display(),
                        chunk = index,
                        %error,
                        "streaming read failed, playing silence"
                    );
                    self.warned = true;
                }
                false
            }
        }
    }

    fn prefetch(&mut self, index: u32) {
        if self.job.next_ready.load(Ordering::Acquire)
            && self.job.next_index.load(Ordering::Acquire) == index
        {
            return;
        }
        self.handle.push(Arc::clone(&self.job), index);
    }
}
