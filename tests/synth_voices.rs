mod common;
use common::{render, synth_with};

use dx7ops::{Patch, Synth, VoiceState};

#[test]
fn test_program_voice_idempotent() {
    let mut patch = Patch::default();
    patch.algorithm = 4;
    patch.feedback = 6;
    patch.lfo.speed = 70;
    patch.op[3].level = 85;

    let mut once: Synth<2> = Synth::new();
    once.program_voice(1, &patch);

    let mut twice: Synth<2> = Synth::new();
    twice.program_voice(1, &patch);
    twice.program_voice(1, &patch);

    assert_eq!(once.voice(1), twice.voice(1));

    once.note_on(64, 90);
    twice.note_on(64, 90);
    assert_eq!(render(&mut once, 5000), render(&mut twice, 5000));
}

#[test]
fn test_released_voice_mutes_and_is_reused() {
    let mut synth: Synth<2> = Synth::new();
    synth.program(&Patch::default());

    assert_eq!(synth.note_on(60, 100), 0);
    assert_eq!(synth.note_on(64, 100), 1);
    render(&mut synth, 2000);

    assert_eq!(synth.note_off(60), Some(0));
    assert_eq!(synth.voice(0).map(|v| v.state()), Some(VoiceState::Off));

    // Init voice release is fast; half a second is plenty
    render(&mut synth, 24548);
    assert_eq!(synth.voice(0).map(|v| v.state()), Some(VoiceState::Mute));
    assert_eq!(synth.active_voices(), 1);

    assert_eq!(synth.note_on(67, 100), 0);
}

#[test]
fn test_mod_wheel_vibrato_changes_output() {
    let mut patch = Patch::default();
    patch.lfo.speed = 60;
    patch.lfo.delay = 0;
    patch.lfo.pitch_mod_sense = 7;

    let mut plain = synth_with(&patch);
    let mut wheel = synth_with(&patch);
    wheel.set_controller(0, 1, 127);

    plain.note_on(69, 100);
    wheel.note_on(69, 100);

    let a = render(&mut plain, 20000);
    let b = render(&mut wheel, 20000);
    assert_ne!(a, b);
}

#[test]
fn test_pitch_bend_raises_pitch() {
    let mut synth = synth_with(&Patch::default());
    synth.note_on(69, 100);
    synth.set_pitch_bend(0, 0x1FFF);
    let bent = common::peak_frequency(&render(&mut synth, 49096));

    // Default bend range is two semitones
    assert!((bent - 493.9).abs() < 3.0, "bent to {bent} Hz");
}
