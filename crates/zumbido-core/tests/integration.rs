//! End-to-end graph scenarios through the public processor API.

use zumbido_core::{ChunkBuilder, NodeType, Processor, fnv1a_hash};

/// Oscillator straight into a terminal amplifier.
fn sine_patch(frequency: f32, amplitude: f32) -> Vec<u8> {
    let mut b = ChunkBuilder::new(48_000);
    let osc = b.node(NodeType::Oscillator, 1, 1);
    b.param("frequency", frequency, 0.0, 20_000.0)
        .param("waveform", 0.0, 0.0, 4.0);
    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", amplitude, 0.0, 2.0);
    b.connect(osc, 0, amp, 0, 1.0);
    b.build()
}

#[test]
fn sine_at_480_hz_first_samples() {
    let p = Processor::new(48_000);
    p.load(&sine_patch(480.0, 1.0)).unwrap();

    let mut out = vec![0.0f32; 8];
    p.process(&mut out, 4, 2);

    // Phase advances pi/50 per sample at 480 Hz / 48 kHz.
    let expected = [0.0f32, 0.0628, 0.1253, 0.1874];
    for (frame, &want) in expected.iter().enumerate() {
        let left = out[frame * 2];
        let right = out[frame * 2 + 1];
        assert!(
            (left - want).abs() < 5e-4,
            "frame {frame}: left {left} vs {want}"
        );
        assert_eq!(left, right, "channels must carry the same signal");
    }
}

#[test]
fn amplifier_at_unity_is_identity() {
    // Constant 0.37 through an amplifier with amplitude 1 and no
    // modulation connection comes out untouched.
    let mut b = ChunkBuilder::new(48_000);
    let level = b.node(NodeType::Parameter, 0, 1);
    b.param("level", 0.37, -1.0, 1.0);
    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", 1.0, 0.0, 2.0);
    b.connect(level, 0, amp, 0, 1.0);

    let p = Processor::new(48_000);
    p.load(&b.build()).unwrap();
    let mut out = vec![0.0f32; 32];
    p.process(&mut out, 16, 2);
    assert!(out.iter().all(|&s| (s - 0.37).abs() < 1e-6));
}

#[test]
fn gate_driven_adsr_profile() {
    // A held gate drives the envelope; the amplifier passes it through as
    // the audible signal.
    let mut b = ChunkBuilder::new(48_000);
    let gate = b.node(NodeType::Parameter, 0, 1);
    b.param("note_gate", 1.0, 0.0, 1.0);
    let env = b.node(NodeType::Envelope, 1, 1);
    b.param("attack", 0.01, 0.0, 10.0)
        .param("decay", 0.1, 0.0, 10.0)
        .param("sustain", 0.5, 0.0, 1.0)
        .param("release", 0.2, 0.0, 10.0);
    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", 1.0, 0.0, 1.0);
    b.connect(gate, 0, env, 0, 1.0);
    b.connect(env, 0, amp, 0, 1.0);

    let p = Processor::new(48_000);
    p.load(&b.build()).unwrap();

    let frames = 48_000 / 8;
    let mut out = vec![0.0f32; frames];
    p.process(&mut out, frames as u32, 1);

    assert!((out[48] - 0.1).abs() < 0.01, "1 ms into attack: {}", out[48]);
    assert!((out[480] - 1.0).abs() < 0.01, "attack peak: {}", out[480]);
    assert!((out[5280] - 0.5).abs() < 0.01, "sustain at 110 ms: {}", out[5280]);
}

#[test]
fn one_shot_gate_node_releases_after_100ms() {
    // A Parameter node whose slice head is `gate` emits the hardwired
    // one-shot pulse: high before 0.1 s, low after.
    let mut b = ChunkBuilder::new(48_000);
    let gate = b.node(NodeType::Parameter, 0, 1);
    b.param("gate", 0.0, 0.0, 1.0);
    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", 1.0, 0.0, 1.0);
    b.connect(gate, 0, amp, 0, 1.0);

    let p = Processor::new(48_000);
    p.load(&b.build()).unwrap();

    let frames = 48_000 / 5; // 200 ms
    let mut out = vec![0.0f32; frames];
    p.process(&mut out, frames as u32, 1);

    assert_eq!(out[0], 1.0);
    assert_eq!(out[4799], 1.0);
    assert_eq!(out[4800], 0.0);
    assert_eq!(out[frames - 1], 0.0);
}

#[test]
fn hard_clip_distortion_with_drive() {
    let mut b = ChunkBuilder::new(48_000);
    let level = b.node(NodeType::Parameter, 0, 1);
    b.param("level", 0.4, -2.0, 2.0);
    let dist = b.node(NodeType::Distortion, 1, 1);
    b.param("drive", 2.0, 0.0, 10.0)
        .param("mix", 1.0, 0.0, 1.0)
        .param("type", 0.0, 0.0, 5.0);
    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", 1.0, 0.0, 1.0);
    b.connect(level, 0, dist, 0, 1.0);
    b.connect(dist, 0, amp, 0, 1.0);

    let p = Processor::new(48_000);
    p.load(&b.build()).unwrap();

    let mut out = vec![0.0f32; 4];
    p.process(&mut out, 4, 1);
    assert!((out[0] - 0.8).abs() < 1e-6, "0.4 driven to {}", out[0]);

    p.set_parameter(fnv1a_hash("level"), 0.7);
    p.process(&mut out, 4, 1);
    assert_eq!(out[0], 1.0, "0.7 driven past the rail clips to 1");
}

#[test]
fn sampler_triggers_on_rising_edge() {
    let mut b = ChunkBuilder::new(48_000);
    b.wavetable("hit", 1, 0.0, 0, 0, &[1.0, 1.0, 1.0, 1.0]);
    let trig = b.node(NodeType::Parameter, 0, 1);
    b.param("trig", 0.0, 0.0, 1.0);
    let sampler = b.node(NodeType::Sampler, 2, 1);
    b.param("sample_index", 0.0, 0.0, 8.0)
        .param("pitch", 1.0, 0.0, 4.0)
        .param("start_position", 0.0, 0.0, 1.0)
        .param("loop", 0.0, 0.0, 1.0);
    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", 1.0, 0.0, 1.0);
    b.connect(trig, 0, sampler, 0, 1.0);
    b.connect(sampler, 0, amp, 0, 1.0);

    let p = Processor::new(48_000);
    p.load(&b.build()).unwrap();

    // Two silent frames while the trigger is low...
    let mut out = vec![0.0f32; 2];
    p.process(&mut out, 2, 1);
    assert_eq!(out, vec![0.0, 0.0]);

    // ...then the trigger rises and the sample plays from its start.
    p.set_parameter(fnv1a_hash("trig"), 1.0);
    p.process(&mut out, 2, 1);
    assert_eq!(out, vec![1.0, 1.0]);
}

#[test]
fn mixer_combines_sources_with_gains() {
    let mut b = ChunkBuilder::new(48_000);
    let a = b.node(NodeType::Parameter, 0, 1);
    b.param("a", 1.0, 0.0, 1.0);
    let c = b.node(NodeType::Parameter, 0, 1);
    b.param("c", 0.5, 0.0, 1.0);
    let mixer = b.node(NodeType::Mixer, 2, 1);
    b.param("gain_0", 0.5, 0.0, 1.0)
        .param("gain_1", 1.0, 0.0, 1.0)
        .param("master_gain", 2.0, 0.0, 4.0);
    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", 1.0, 0.0, 1.0);
    b.connect(a, 0, mixer, 0, 1.0);
    b.connect(c, 0, mixer, 1, 1.0);
    b.connect(mixer, 0, amp, 0, 1.0);

    let p = Processor::new(48_000);
    p.load(&b.build()).unwrap();
    let mut out = vec![0.0f32; 4];
    p.process(&mut out, 4, 1);
    // (1*0.5 + 0.5*1) * 2 = 2
    assert!(out.iter().all(|&s| (s - 2.0).abs() < 1e-6));
}

#[test]
fn lowpass_at_nyquist_passes_dc() {
    let mut b = ChunkBuilder::new(48_000);
    let level = b.node(NodeType::Parameter, 0, 1);
    b.param("level", 1.0, 0.0, 1.0);
    let filter = b.node(NodeType::Filter, 2, 1);
    b.param("cutoff", 24_000.0, 20.0, 24_000.0)
        .param("resonance", 0.707, 0.1, 10.0)
        .param("type", 0.0, 0.0, 2.0);
    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", 1.0, 0.0, 1.0);
    b.connect(level, 0, filter, 0, 1.0);
    b.connect(filter, 0, amp, 0, 1.0);

    let p = Processor::new(48_000);
    p.load(&b.build()).unwrap();
    let frames = 4800;
    let mut out = vec![0.0f32; frames];
    p.process(&mut out, frames as u32, 1);
    assert!(
        (out[frames - 1] - 1.0).abs() < 0.01,
        "steady-state gain {}",
        out[frames - 1]
    );
}

#[test]
fn connection_strength_scales_the_edge() {
    let p = Processor::new(48_000);
    let mut b = ChunkBuilder::new(48_000);
    let level = b.node(NodeType::Parameter, 0, 1);
    b.param("level", 1.0, 0.0, 1.0);
    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", 1.0, 0.0, 1.0);
    b.connect(level, 0, amp, 0, 0.25);
    p.load(&b.build()).unwrap();

    let mut out = vec![0.0f32; 4];
    p.process(&mut out, 4, 1);
    assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
}

#[test]
fn two_connections_to_one_input_sum() {
    let mut b = ChunkBuilder::new(48_000);
    let x = b.node(NodeType::Parameter, 0, 1);
    b.param("x", 0.3, 0.0, 1.0);
    let y = b.node(NodeType::Parameter, 0, 1);
    b.param("y", 0.2, 0.0, 1.0);
    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", 1.0, 0.0, 1.0);
    b.connect(x, 0, amp, 0, 1.0);
    b.connect(y, 0, amp, 0, 1.0);

    let p = Processor::new(48_000);
    p.load(&b.build()).unwrap();
    let mut out = vec![0.0f32; 4];
    p.process(&mut out, 4, 1);
    assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn envelope_modulates_amplifier_through_input_one() {
    // Oscillator on input 0, held-gate envelope with instant attack on
    // input 1: the output follows the oscillator at sustain level.
    let mut b = ChunkBuilder::new(48_000);
    let gate = b.node(NodeType::Parameter, 0, 1);
    b.param("note_gate", 1.0, 0.0, 1.0);
    let env = b.node(NodeType::Envelope, 1, 1);
    b.param("attack", 0.0, 0.0, 1.0)
        .param("decay", 0.0, 0.0, 1.0)
        .param("sustain", 0.5, 0.0, 1.0)
        .param("release", 0.0, 0.0, 1.0);
    let level = b.node(NodeType::Parameter, 0, 1);
    b.param("level", 0.8, 0.0, 1.0);
    let amp = b.node(NodeType::Amplifier, 2, 1);
    b.param("amplitude", 1.0, 0.0, 1.0);
    b.connect(gate, 0, env, 0, 1.0);
    b.connect(level, 0, amp, 0, 1.0);
    b.connect(env, 0, amp, 1, 1.0);

    let p = Processor::new(48_000);
    p.load(&b.build()).unwrap();
    let mut out = vec![0.0f32; 16];
    p.process(&mut out, 16, 1);
    // After the instant attack/decay settle: 0.8 * 0.5.
    assert!((out[8] - 0.4).abs() < 1e-6, "modulated output {}", out[8]);
}
