//! Polyphonic voice layer.
//!
//! [`PolyphonicProcessor`] wraps [`MAX_VOICES`] independent graph
//! processors, all loaded with the same chunk. Rising edges on the `gate`
//! parameter allocate a voice (stealing the oldest active one when the
//! pool is full); falling edges route note-off to the voice that owns the
//! gate. Every other parameter write broadcasts to the active voices.
//! Voice outputs sum into the block and are scaled by `1/√active` toward
//! equal-power mixing.
//!
//! Voices age by frames. Once a voice's gate has fallen, a ~50 ms release
//! window runs out and the voice deactivates — sized for the drum-like
//! one-shot material this layer mostly plays.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use zumbido_core::{DecodeError, Processor, keys};
use zumbido_io::{Prefetcher, StreamError};

/// Number of voices in the fixed pool.
pub const MAX_VOICES: usize = 16;

struct Voice {
    processor: Processor,
    active: bool,
    /// Samples since this voice was (re)allocated.
    age: u64,
    /// Parameter hash that triggered the voice.
    trigger_param: u64,
    last_gate: f32,
    /// Samples accumulated since the gate fell.
    release_age: u32,
}

impl Voice {
    fn new(sample_rate: u32) -> Self {
        Self {
            processor: Processor::new(sample_rate),
            active: false,
            age: 0,
            trigger_param: 0,
            last_gate: 0.0,
            release_age: 0,
        }
    }
}

struct GateRoute {
    voice: usize,
    last_value: f32,
}

struct Pool {
    voices: Vec<Voice>,
    routes: HashMap<u64, GateRoute>,
    scratch: Vec<f32>,
    frames_rendered: u64,
}

/// Introspection snapshot of one voice, for hosts and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoiceSnapshot {
    /// Whether the voice is currently sounding.
    pub active: bool,
    /// Samples since the voice was allocated.
    pub age: u64,
    /// Hash of the parameter whose rising edge triggered the voice.
    pub trigger_param: u64,
}

/// A 16-voice polyphonic wrapper around [`Processor`].
///
/// The API mirrors the single-voice processor; the one behavioral
/// difference is gate handling, which turns edges into voice allocation.
pub struct PolyphonicProcessor {
    sample_rate: u32,
    pool: Mutex<Pool>,
}

impl PolyphonicProcessor {
    /// Creates the voice pool. Voices render at `sample_rate`.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        let voices = (0..MAX_VOICES).map(|_| Voice::new(sample_rate)).collect();
        tracing::debug!(voices = MAX_VOICES, sample_rate, "polyphonic pool ready");
        Self {
            sample_rate,
            pool: Mutex::new(Pool {
                voices,
                routes: HashMap::new(),
                scratch: Vec::new(),
                frames_rendered: 0,
            }),
        }
    }

    /// Loads the chunk into every voice.
    pub fn load(&self, bytes: &[u8]) -> Result<(), DecodeError> {
        let mut pool = self.lock_pool();
        for voice in &mut pool.voices {
            voice.processor.load(bytes)?;
            voice.active = false;
            voice.age = 0;
            voice.last_gate = 0.0;
            voice.release_age = 0;
        }
        pool.routes.clear();
        pool.frames_rendered = 0;
        Ok(())
    }

    /// Binds a streaming payload file on every voice.
    ///
    /// Each voice gets its own source (independent playback positions);
    /// one `prefetcher` worker serves them all.
    pub fn set_file_path(
        &self,
        stream_index: usize,
        path: impl AsRef<Path>,
        prefetcher: &Prefetcher,
    ) -> Result<(), StreamError> {
        let pool = self.lock_pool();
        for voice in &pool.voices {
            zumbido_io::set_file_path(&voice.processor, stream_index, path.as_ref(), prefetcher)?;
        }
        Ok(())
    }

    /// Routes a parameter write.
    ///
    /// `gate` edges allocate and release voices; anything else broadcasts
    /// to the active voices.
    pub fn set_parameter(&self, name_hash: u64, value: f32) {
        let mut pool = self.lock_pool();

        if name_hash == keys::GATE {
            let last = pool
                .routes
                .get(&name_hash)
                .map_or(0.0, |route| route.last_value);

            if last < 0.5 && value >= 0.5 {
                let voice_index = allocate_voice(&mut pool.voices, name_hash);
                let voice = &mut pool.voices[voice_index];
                voice.processor.set_parameter(name_hash, value);
                voice.last_gate = value;
                tracing::debug!(voice = voice_index, "gate rising edge allocated voice");
                pool.routes.insert(
                    name_hash,
                    GateRoute {
                        voice: voice_index,
                        last_value: value,
                    },
                );
            } else if last >= 0.5 && value < 0.5 {
                if let Some(route) = pool.routes.remove(&name_hash) {
                    let voice = &mut pool.voices[route.voice];
                    if voice.active {
                        voice.processor.set_parameter(name_hash, value);
                        voice.last_gate = value;
                        voice.release_age = 0;
                        tracing::debug!(voice = route.voice, "gate falling edge released voice");
                    }
                }
            }
            return;
        }

        for voice in &pool.voices {
            if voice.active {
                voice.processor.set_parameter(name_hash, value);
            }
        }
    }

    /// Renders one block: active voices sum into `out` (interleaved),
    /// scaled by `1/√active_count`.
    pub fn process(&self, out: &mut [f32], frames: u32, channels: u32) {
        let needed = frames as usize * channels as usize;
        debug_assert!(out.len() >= needed, "output buffer too small");
        out[..needed].fill(0.0);

        let mut pool = self.lock_pool();
        let pool = &mut *pool;
        pool.scratch.resize(needed, 0.0);

        let mut active_count = 0usize;
        for voice in &mut pool.voices {
            if !voice.active {
                continue;
            }
            voice.processor.process(&mut pool.scratch, frames, channels);
            for (mixed, &sample) in out[..needed].iter_mut().zip(&pool.scratch) {
                *mixed += sample;
            }
            active_count += 1;
        }

        update_voice_ages(&mut pool.voices, frames, self.sample_rate);
        pool.frames_rendered += u64::from(frames);

        if active_count > 1 {
            let gain = 1.0 / (active_count as f32).sqrt();
            for sample in &mut out[..needed] {
                *sample *= gain;
            }
        }
    }

    /// Absolute time in seconds rendered so far.
    #[must_use]
    pub fn current_time(&self) -> f32 {
        let pool = self.lock_pool();
        pool.frames_rendered as f32 / self.sample_rate as f32
    }

    /// Number of currently active voices.
    #[must_use]
    pub fn active_voices(&self) -> usize {
        self.lock_pool().voices.iter().filter(|v| v.active).count()
    }

    /// Per-voice state snapshot, in pool order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<VoiceSnapshot> {
        self.lock_pool()
            .voices
            .iter()
            .map(|v| VoiceSnapshot {
                active: v.active,
                age: v.age,
                trigger_param: v.trigger_param,
            })
            .collect()
    }

    fn lock_pool(&self) -> MutexGuard<'_, Pool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Picks the first inactive voice, or steals the oldest active one.
fn allocate_voice(voices: &mut [Voice], trigger_param: u64) -> usize {
    let index = voices
        .iter()
        .position(|v| !v.active)
        .unwrap_or_else(|| oldest_voice(voices));

    let stealing = voices[index].active;
    let voice = &mut voices[index];
    voice.active = true;
    voice.age = 0;
    voice.trigger_param = trigger_param;
    voice.release_age = 0;
    if stealing {
        tracing::debug!(voice = index, "stealing oldest active voice");
        // The stolen voice must see a clean note-on: force its gate low
        // before the caller raises it again.
        voice.processor.set_parameter(keys::GATE, 0.0);
    }
    index
}

fn oldest_voice(voices: &[Voice]) -> usize {
    voices
        .iter()
        .enumerate()
        .max_by_key(|(_, v)| v.age)
        .map_or(0, |(i, _)| i)
}

/// Ages active voices by the block and retires released ones after the
/// ~50 ms tail window.
fn update_voice_ages(voices: &mut [Voice], frames: u32, sample_rate: u32) {
    let release_limit = sample_rate / 20;
    for (index, voice) in voices.iter_mut().enumerate() {
        if !voice.active {
            continue;
        }
        voice.age += u64::from(frames);
        if voice.last_gate < 0.5 {
            voice.release_age += frames;
            if voice.release_age > release_limit {
                voice.active = false;
                tracing::trace!(voice = index, "voice retired after release tail");
            }
        }
    }
}
