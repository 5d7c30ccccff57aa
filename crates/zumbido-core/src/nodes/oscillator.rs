//! Oscillator kernel: sine, square, saw, triangle, and noise.
//!
//! The phase accumulator runs in radians and wraps at 2π. Input 0 is
//! audio-rate additive frequency modulation, so the phase increment is
//! recomputed every frame.

use core::f32::consts::{PI, TAU};
use libm::sinf;

use crate::chunk::Node;
use crate::hash::keys;

use super::{KernelCtx, Xorshift32};

/// Waveform selected by the `waveform` parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Waveform {
    #[default]
    Sine,
    Square,
    Saw,
    Triangle,
    Noise,
}

impl Waveform {
    fn from_param(value: f32) -> Self {
        match value as u32 {
            1 => Self::Square,
            2 => Self::Saw,
            3 => Self::Triangle,
            4 => Self::Noise,
            _ => Self::Sine,
        }
    }
}

/// Oscillator scratch: the phase accumulator.
#[derive(Default)]
pub(crate) struct OscillatorState {
    phase: f32,
}

pub(crate) fn process(
    state: &mut OscillatorState,
    node: &Node,
    ctx: &KernelCtx<'_>,
    rng: &mut Xorshift32,
    out: &mut [f32],
) {
    let base_frequency = ctx.params.node_value(node, keys::FREQUENCY).unwrap_or(440.0);
    let waveform =
        Waveform::from_param(ctx.params.node_value(node, keys::WAVEFORM).unwrap_or(0.0));

    for i in 0..ctx.frames {
        let frequency = base_frequency + ctx.inputs.sum(0, i);
        let increment = TAU * frequency / ctx.sample_rate;

        out[i] = match waveform {
            Waveform::Sine => sinf(state.phase),
            Waveform::Square => {
                if state.phase < PI {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => 2.0 * (state.phase / TAU) - 1.0,
            Waveform::Triangle => {
                if state.phase < PI {
                    -1.0 + 2.0 * (state.phase / PI)
                } else {
                    3.0 - 2.0 * (state.phase / PI)
                }
            }
            Waveform::Noise => rng.next_bipolar(),
        };

        state.phase += increment;
        if state.phase > TAU {
            state.phase -= TAU;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Kernel;
    use super::super::testutil::KernelRun;
    use crate::chunk::NodeType;

    fn oscillator(frequency: f32, waveform: f32) -> (KernelRun, Kernel) {
        let run = KernelRun::new(NodeType::Oscillator, 1)
            .param("frequency", frequency)
            .param("waveform", waveform);
        let kernel = Kernel::for_node(&run.node);
        (run, kernel)
    }

    #[test]
    fn sine_first_samples_match_phase_steps() {
        let (run, mut kernel) = oscillator(480.0, 0.0);
        let out = run.run(&mut kernel, 4);
        // 480 Hz at 48 kHz advances pi/50 per sample.
        let step = core::f32::consts::PI / 50.0;
        for (i, &sample) in out.iter().enumerate() {
            let expected = (i as f32 * step).sin();
            assert!(
                (sample - expected).abs() < 1e-5,
                "sample {i}: {sample} vs {expected}"
            );
        }
    }

    #[test]
    fn sine_frequency_via_zero_crossings() {
        let (run, mut kernel) = oscillator(440.0, 0.0);
        let out = run.run(&mut kernel, 48_000);
        let mut crossings = 0i32;
        let mut prev = 0.0;
        for &s in &out {
            if prev <= 0.0 && s > 0.0 {
                crossings += 1;
            }
            prev = s;
        }
        assert!(
            (crossings - 440).abs() <= 2,
            "expected ~440 crossings, got {crossings}"
        );
    }

    #[test]
    fn square_is_bipolar() {
        let (run, mut kernel) = oscillator(100.0, 1.0);
        let out = run.run(&mut kernel, 4800);
        assert!(out.iter().all(|&s| s == 1.0 || s == -1.0));
        assert!(out.contains(&1.0) && out.contains(&-1.0));
    }

    #[test]
    fn saw_spans_full_range() {
        let (run, mut kernel) = oscillator(100.0, 2.0);
        let out = run.run(&mut kernel, 4800);
        let min = out.iter().cloned().fold(f32::MAX, f32::min);
        let max = out.iter().cloned().fold(f32::MIN, f32::max);
        assert!(min < -0.95 && max > 0.95);
    }

    #[test]
    fn triangle_stays_in_range() {
        let (run, mut kernel) = oscillator(250.0, 3.0);
        let out = run.run(&mut kernel, 4800);
        assert!(out.iter().all(|&s| (-1.001..=1.001).contains(&s)));
    }

    #[test]
    fn frequency_modulation_shifts_pitch() {
        // A constant +440 on input 0 doubles the effective frequency.
        let run = KernelRun::new(NodeType::Oscillator, 1)
            .param("frequency", 440.0)
            .param("waveform", 0.0)
            .input(0, vec![440.0; 48_000], 1.0);
        let mut kernel = Kernel::for_node(&run.node);
        let out = run.run(&mut kernel, 48_000);
        let mut crossings = 0i32;
        let mut prev = 0.0;
        for &s in &out {
            if prev <= 0.0 && s > 0.0 {
                crossings += 1;
            }
            prev = s;
        }
        assert!(
            (crossings - 880).abs() <= 2,
            "expected ~880 crossings, got {crossings}"
        );
    }

    #[test]
    fn unknown_waveform_defaults_to_sine() {
        let (run_sine, mut sine) = oscillator(330.0, 0.0);
        let (run_unknown, mut unknown) = oscillator(330.0, 17.0);
        assert_eq!(run_sine.run(&mut sine, 64), run_unknown.run(&mut unknown, 64));
    }
}
