//! ADSR envelope kernel.
//!
//! Input 0 is the gate. A rising edge (≤ 0.5 → > 0.5) enters Attack; a
//! falling edge while the envelope is live enters Release from the current
//! level. Ramps are linear: 0→1 over `attack`, 1→`sustain` over `decay`,
//! hold, then release-start→0 over `release`. Zero-length phases complete
//! immediately.

use crate::chunk::Node;
use crate::hash::keys;

use super::KernelCtx;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum EnvPhase {
    #[default]
    Off,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Envelope scratch state.
#[derive(Default)]
pub(crate) struct EnvelopeState {
    phase: EnvPhase,
    time: f32,
    level: f32,
    last_gate: bool,
    release_start: f32,
}

pub(crate) fn process(
    state: &mut EnvelopeState,
    node: &Node,
    ctx: &KernelCtx<'_>,
    out: &mut [f32],
) {
    let attack = ctx.params.node_value(node, keys::ATTACK).unwrap_or(0.01);
    let decay = ctx.params.node_value(node, keys::DECAY).unwrap_or(0.1);
    let sustain = ctx.params.node_value(node, keys::SUSTAIN).unwrap_or(0.7);
    let release = ctx.params.node_value(node, keys::RELEASE).unwrap_or(0.2);

    let sample_time = 1.0 / ctx.sample_rate;

    for i in 0..ctx.frames {
        let gate = ctx.inputs.sum(0, i);
        let gate_on = gate > 0.5;
        let trigger_attack = gate_on && !state.last_gate;
        let trigger_release = !gate_on && state.last_gate;
        state.last_gate = gate_on;

        if trigger_attack {
            state.phase = EnvPhase::Attack;
            state.time = 0.0;
        } else if trigger_release && state.phase != EnvPhase::Off {
            state.phase = EnvPhase::Release;
            state.time = 0.0;
            state.release_start = state.level;
        }

        match state.phase {
            EnvPhase::Attack => {
                if attack > 0.0 {
                    state.level = state.time / attack;
                    if state.level >= 1.0 {
                        state.level = 1.0;
                        state.phase = EnvPhase::Decay;
                        state.time = 0.0;
                    }
                } else {
                    state.level = 1.0;
                    state.phase = EnvPhase::Decay;
                    state.time = 0.0;
                }
            }
            EnvPhase::Decay => {
                if decay > 0.0 {
                    let progress = state.time / decay;
                    state.level = 1.0 - (1.0 - sustain) * progress;
                    if progress >= 1.0 {
                        state.level = sustain;
                        state.phase = EnvPhase::Sustain;
                        state.time = 0.0;
                    }
                } else {
                    state.level = sustain;
                    state.phase = EnvPhase::Sustain;
                    state.time = 0.0;
                }
            }
            EnvPhase::Sustain => {
                state.level = sustain;
            }
            EnvPhase::Release => {
                if release > 0.0 {
                    let progress = state.time / release;
                    state.level = state.release_start * (1.0 - progress);
                    if progress >= 1.0 {
                        state.level = 0.0;
                        state.phase = EnvPhase::Off;
                        state.time = 0.0;
                    }
                } else {
                    state.level = 0.0;
                    state.phase = EnvPhase::Off;
                    state.time = 0.0;
                }
            }
            EnvPhase::Off => {
                state.level = 0.0;
            }
        }

        if state.phase != EnvPhase::Off {
            state.time += sample_time;
        }

        out[i] = state.level;

        // Track the live level so a release can start from wherever the
        // envelope actually is; during Release the start level is pinned.
        if state.phase != EnvPhase::Release {
            state.release_start = state.level;
        }
    }
}
