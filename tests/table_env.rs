mod common;
use common::peak_frequency;

use dx7ops::fm::env::{level_30, TableEnvGen};
use dx7ops::fm::envelope::EnvelopeGenerator;
use dx7ops::fm::operator::Ops;
use dx7ops::{Firmware, Patch, NUM_OPERATORS, SAMPLE_RATE};

/// Drive the OPS straight from patch values, with firmware-computed pitches
fn table_ops(patch: &Patch, note: u8) -> Ops<NUM_OPERATORS, TableEnvGen> {
    let mut fw = Firmware::new();
    fw.load_voice(patch);
    fw.voice_add(note, 100);
    let voice_pitch = fw.hw().voice_pitch();

    let mut ops: Ops<NUM_OPERATORS, TableEnvGen> = Ops::new();
    ops.set_algorithm(patch.algorithm);
    ops.set_feedback(patch.feedback);
    ops.set_sync(patch.osc_sync);

    for (i, op) in patch.op.iter().enumerate() {
        ops.set_freq(i, fw.hw().op_state(i).compute_ops_freq14(voice_pitch, 0));
        ops.eg_mut(i).program(&op.envelope, op.level);
        ops.eg_mut(i).key_on();
    }
    ops.key_on();
    ops
}

#[test]
fn test_table_envelope_voice_pitch() {
    let patch = Patch::default();
    let mut ops = table_ops(&patch, 69);

    let fw_inc = {
        let mut fw = Firmware::new();
        fw.voice_add(69, 100);
        fw.hw().phase_inc(NUM_OPERATORS - 1)
    };
    assert_eq!(ops.phase_inc(NUM_OPERATORS - 1), fw_inc);

    let samples: Vec<i32> = (0..SAMPLE_RATE).map(|_| ops.sample()).collect();
    let freq = peak_frequency(&samples);
    assert!((freq - 440.0).abs() < 1.0, "rendered at {freq} Hz");

    let peak = samples.iter().map(|s| s.abs()).max().unwrap_or(0);
    assert!(peak > 0x3000, "peak {peak:#x}");
}

#[test]
fn test_table_envelope_release() {
    let patch = Patch::default();
    let mut ops = table_ops(&patch, 60);

    for _ in 0..1000 {
        ops.sample();
    }
    for i in 0..NUM_OPERATORS {
        ops.eg_mut(i).key_off();
    }
    for _ in 0..SAMPLE_RATE {
        ops.sample();
    }

    assert!(ops.egs().all(|eg| eg.is_complete()));
    let tail = (0..1000).map(|_| ops.sample().abs()).max().unwrap_or(0);
    assert!(tail < 0x100, "tail {tail:#x}");
}

#[test]
fn test_table_envelope_starts_at_release_level() {
    let mut patch = Patch::default();
    for op in patch.op.iter_mut() {
        op.envelope.level = [99, 99, 99, 60];
    }
    let mut ops = table_ops(&patch, 69);

    for (i, op) in patch.op.iter().enumerate() {
        let start = level_30((60 * u32::from(op.level) / 100) as u8);
        assert_eq!(ops.eg(i).amplitude(), start, "operator {}", NUM_OPERATORS - i);
    }

    // Held at sustain, a second key on drops back to L4
    for _ in 0..SAMPLE_RATE {
        ops.sample();
    }
    for (i, op) in patch.op.iter().enumerate() {
        ops.eg_mut(i).key_on();
        let start = level_30((60 * u32::from(op.level) / 100) as u8);
        assert_eq!(ops.eg(i).amplitude(), start, "operator {}", NUM_OPERATORS - i);
    }
}
