// Copyright 2025 Tyler Neely (tylerneely@gmail.com).
// Copyright 2021 Emilie Gillet (emilie.o.gillet@gmail.com)
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.
//
// See http://creativecommons.org/licenses/MIT/ for more information.

//! DX7 firmware model
//!
//! The part of the DX7 main CPU program that turns patch data and
//! performance events into EGS register writes. Patch parameters are
//! translated once on load; note events and the 375 Hz control tick then
//! only combine precomputed values.

use log::{debug, trace};

use super::constants::{AMP_MOD, KBD_SCALING_GROUPS, MASTER_TUNE, VOICE_PITCH_OFFSET};
use super::controllers::{ModSource, Modulation};
use super::dx_units::{
    eg_level6, eg_rate6, kbd_scaling, kbd_scaling_group, key_pitch, key_velocity_sense,
    midi_velocity, op_atten8, op_detune, op_pitch, velocity_atten,
};
use super::egs::Egs;
use super::envelope::NUM_STAGES;
use super::lfo::Lfo;
use super::patch::{FunctionParams, Patch};
use super::pitchenv::PitchEg;
use crate::NUM_OPERATORS;

/// Pitch bend units per semitone of bend range (14-bit log pitch, Q13)
const PITCH_BEND_STEP: i32 = 0x55;

/// Firmware state for one voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firmware {
    hw: Egs,
    patch: Patch,
    params: FunctionParams,
    lfo: Lfo,
    pitch_eg: PitchEg,
    modulation: Modulation,

    op_out: [[i16; KBD_SCALING_GROUPS]; NUM_OPERATORS],
    op_key_vel_sense: [u16; NUM_OPERATORS],
    op_enable: [bool; NUM_OPERATORS],

    key_pitch: u16,
    pitch_bend: i16,
}

impl Default for Firmware {
    fn default() -> Self {
        Self::new()
    }
}

impl Firmware {
    /// Create firmware state with the init voice and default function parameters
    pub fn new() -> Self {
        let mut fw = Self {
            hw: Egs::new(),
            patch: Patch::default(),
            params: FunctionParams::default(),
            lfo: Lfo::new(),
            pitch_eg: PitchEg::new(),
            modulation: Modulation::new(),
            op_out: [[0; KBD_SCALING_GROUPS]; NUM_OPERATORS],
            op_key_vel_sense: [0; NUM_OPERATORS],
            op_enable: [true; NUM_OPERATORS],
            key_pitch: 0,
            pitch_bend: 0,
        };
        let patch = fw.patch;
        fw.load_voice(&patch);
        fw.load_params(&FunctionParams::default());
        fw
    }

    /// Load a voice patch into the EGS and OPS registers
    pub fn load_voice(&mut self, patch: &Patch) {
        self.patch = *patch;

        for (i, op) in patch.op.iter().enumerate() {
            for stage in 0..NUM_STAGES {
                self.hw.set_op_eg_rate(i, stage, eg_rate6(op.envelope.rate[stage]));
                self.hw.set_op_eg_level(i, stage, eg_level6(op.envelope.level[stage]));
            }

            self.op_out[i] = kbd_scaling(op.level, &op.keyboard_scaling);
            self.op_key_vel_sense[i] = key_velocity_sense(op.velocity_sensitivity);

            let (pitch, fixed) = op_pitch(op);
            self.hw.set_op_pitch_fixed(i, fixed);
            self.hw.set_op_pitch(i, pitch);

            self.hw.set_op_rate_scaling(i, op.rate_scaling);
            self.hw.set_op_amp_mod_sens(i, op.amp_mod_sensitivity);
            self.hw.set_op_detune(i, op_detune(op));

            self.op_enable[i] = patch.is_enabled(i);
        }

        self.pitch_eg.load(&patch.pitch_envelope);

        self.hw.set_sync(patch.osc_sync);
        self.hw.set_algorithm(patch.algorithm);
        self.hw.set_feedback(patch.feedback);

        self.lfo.load(&patch.lfo);

        debug!(
            "load voice {:?}: algorithm {} feedback {} ops {:06b}",
            patch.name(),
            patch.algorithm + 1,
            patch.feedback,
            patch.op_enable
        );
    }

    /// Load the function parameters (controller ranges and pitch bend range)
    pub fn load_params(&mut self, params: &FunctionParams) {
        self.params = *params;
        self.modulation.load(params);
    }

    /// Control-rate handler, call at 375 Hz
    pub fn tick(&mut self) {
        self.lfo.tick();

        self.compute_amplitude_modulation();

        if self.pitch_eg.tick() {
            self.load_freq();
        }

        self.compute_pitch_modulation();

        self.hw.send_freq();

        trace!(
            "tick: voice pitch {:#06x} pitch mod {} amp mod {:#04x} lfo {}",
            self.hw.voice_pitch(),
            self.hw.pitch_mod(),
            self.hw.amp_mod(),
            self.lfo.output()
        );
    }

    /// Note on
    pub fn voice_add(&mut self, note: u8, midi_velocity_7: u8) {
        let velocity = midi_velocity(midi_velocity_7);

        let note = (i16::from(note) + i16::from(self.patch.transpose) - 24).clamp(0, 127) as u8;

        self.key_pitch = key_pitch(note);
        self.load_operator_data(note, velocity);
        self.load_freq();
        self.hw.send_freq();

        self.lfo.key_on();
        self.pitch_eg.key_on();

        self.hw.key_on();

        debug!(
            "voice add: note {} velocity {} key pitch {:#06x}",
            note, velocity, self.key_pitch
        );
    }

    /// Note off
    pub fn voice_remove(&mut self) {
        self.pitch_eg.key_off();
        self.hw.key_off();
    }

    /// Set pitch bend from a signed 14-bit value (-0x2000..0x1FFF)
    pub fn set_pitch_bend(&mut self, raw_14: i16) {
        let range = i32::from(self.params.pitch_bend_range.min(12));
        self.pitch_bend = ((i32::from(raw_14) * range * PITCH_BEND_STEP) >> 13) as i16;
    }

    /// Set the raw mod wheel input (0-255)
    pub fn set_mod_wheel(&mut self, raw: u8) {
        self.modulation.raw_input(ModSource::ModWheel, raw);
    }

    /// Set the raw foot controller input (0-255)
    pub fn set_foot_control(&mut self, raw: u8) {
        self.modulation.raw_input(ModSource::Foot, raw);
    }

    /// Set the raw breath controller input (0-255)
    pub fn set_breath_control(&mut self, raw: u8) {
        self.modulation.raw_input(ModSource::Breath, raw);
    }

    /// Set the raw aftertouch input (0-255)
    pub fn set_after_touch(&mut self, raw: u8) {
        self.modulation.raw_input(ModSource::AfterTouch, raw);
    }

    /// EGS driven by this firmware
    pub fn hw(&self) -> &Egs {
        &self.hw
    }

    /// Mutable EGS, for the audio path
    pub fn hw_mut(&mut self) -> &mut Egs {
        &mut self.hw
    }

    /// Loaded patch
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// LFO state
    pub fn lfo(&self) -> &Lfo {
        &self.lfo
    }

    /// Pitch envelope state
    pub fn pitch_eg(&self) -> &PitchEg {
        &self.pitch_eg
    }

    /// Modulation mixer state
    pub fn modulation(&self) -> &Modulation {
        &self.modulation
    }

    /// Pitch bend in 14-bit log pitch units
    pub fn pitch_bend(&self) -> i16 {
        self.pitch_bend
    }

    fn load_operator_data(&mut self, note: u8, velocity: u8) {
        let group = kbd_scaling_group(note);

        for op_index in 0..NUM_OPERATORS {
            let vol = velocity_atten(self.op_key_vel_sense[op_index], velocity);

            let atten_8 = if self.op_enable[op_index] {
                op_atten8(self.op_out[op_index][group], vol)
            } else {
                0xFF
            };

            self.hw.set_op_level(op_index, atten_8);
        }
    }

    fn load_freq(&mut self) {
        let mut pitch = i32::from(self.key_pitch) + self.pitch_eg.output();

        pitch = (pitch - VOICE_PITCH_OFFSET).max(0);
        pitch += MASTER_TUNE;

        self.hw.set_voice_pitch(pitch.min(0xFFFF) as u16);
    }

    fn compute_amplitude_modulation(&mut self) {
        let bias = u16::from(self.modulation.eg_bias());

        let mut amp_mod = (u16::from(self.lfo.amp_mod()) + u16::from(self.modulation.amp_mod())).min(0xFF);
        amp_mod = (amp_mod + bias).min(0xFF) - bias;

        // Unipolar LFO: 0x00 at the top of the wave, 0xFF at the bottom
        let lfo = !(self.lfo.output() as u8) ^ 0x80;
        let value = ((amp_mod * u16::from(lfo)) >> 8) + bias;
        let value = value.min(0xFF) as u8;

        self.hw.set_amp_mod(AMP_MOD[usize::from(!value)]);
    }

    fn compute_pitch_modulation(&mut self) {
        let depth = (u16::from(self.lfo.pitch_mod()) + u16::from(self.modulation.pitch_mod())).min(0xFF);
        let depth = (depth * u16::from(self.lfo.pitch_mod_sense())) >> 8;

        let value = i32::from(depth) * i32::from(self.lfo.output());
        let value = (value >> 1) + i32::from(self.pitch_bend);

        self.hw.set_pitch_mod(value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm::envelope::{EnvelopeGenerator, Phase};
    use crate::fm::patch::OscMode;
    use crate::SAMPLE_RATE;

    fn frequency(phase_inc: u32) -> f64 {
        f64::from(phase_inc) * f64::from(SAMPLE_RATE) / 4294967296.0
    }

    #[test]
    fn test_a4_is_440() {
        let mut fw = Firmware::new();
        fw.voice_add(69, 100);

        let f = frequency(fw.hw().phase_inc(NUM_OPERATORS - 1));
        assert!((f - 440.0).abs() < 1.0, "A4 = {} Hz", f);
    }

    #[test]
    fn test_pitch_monotonic() {
        let mut fw = Firmware::new();
        let mut last = 0;
        for note in 0..=127u8 {
            fw.voice_add(note, 100);
            let inc = fw.hw().phase_inc(NUM_OPERATORS - 1);
            if note >= 24 {
                assert!(inc > last, "note {}", note);
            } else {
                assert!(inc >= last, "note {}", note);
            }
            last = inc;
        }
    }

    #[test]
    fn test_octaves_double() {
        let mut fw = Firmware::new();
        for note in 36..=96u8 {
            fw.voice_add(note, 100);
            let low = f64::from(fw.hw().phase_inc(NUM_OPERATORS - 1));
            fw.voice_add(note + 12, 100);
            let high = f64::from(fw.hw().phase_inc(NUM_OPERATORS - 1));
            assert!((high / low - 2.0).abs() < 0.002, "note {}", note);
        }
    }

    #[test]
    fn test_transpose() {
        let mut patch = Patch::default();
        patch.transpose = 36;

        let mut fw = Firmware::new();
        fw.voice_add(69, 100);
        let a4 = fw.hw().phase_inc(NUM_OPERATORS - 1);

        fw.load_voice(&patch);
        fw.voice_add(57, 100);
        assert_eq!(fw.hw().phase_inc(NUM_OPERATORS - 1), a4);
    }

    #[test]
    fn test_fixed_frequency_ignores_key() {
        let mut patch = Patch::default();
        patch.op[NUM_OPERATORS - 1].mode = OscMode::Fixed;
        patch.op[NUM_OPERATORS - 1].coarse = 2;

        let mut fw = Firmware::new();
        fw.load_voice(&patch);
        fw.voice_add(40, 100);
        let low = fw.hw().phase_inc(NUM_OPERATORS - 1);
        fw.voice_add(90, 100);
        assert_eq!(fw.hw().phase_inc(NUM_OPERATORS - 1), low);

        // Coarse 2 is 100 Hz
        let f = frequency(low);
        assert!((f - 100.0).abs() < 1.0, "fixed = {} Hz", f);
    }

    #[test]
    fn test_load_voice_idempotent() {
        let mut patch = Patch::default();
        patch.algorithm = 4;
        patch.feedback = 7;
        patch.op[2].level = 80;
        patch.op[2].keyboard_scaling.left_depth = 40;

        let mut once = Firmware::new();
        once.load_voice(&patch);

        let mut twice = Firmware::new();
        twice.load_voice(&patch);
        twice.load_voice(&patch);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_disabled_operator_is_silent() {
        let mut patch = Patch::default();
        patch.op_enable = 0b011111;

        let mut fw = Firmware::new();
        fw.load_voice(&patch);
        fw.voice_add(69, 127);

        for _ in 0..1000 {
            fw.hw_mut().sample();
        }
        assert_eq!(fw.hw().eg(NUM_OPERATORS - 1).atten12(), 0xFFF);
    }

    #[test]
    fn test_note_cycle_reaches_end() {
        let mut fw = Firmware::new();
        fw.voice_add(60, 100);
        assert_eq!(fw.pitch_eg().phase(), Phase::Attack);
        assert!(!fw.hw().is_complete());

        fw.voice_remove();
        assert_eq!(fw.pitch_eg().phase(), Phase::Release);

        // Init voice releases at rate 99
        for _ in 0..SAMPLE_RATE {
            fw.hw_mut().sample();
        }
        assert!(fw.hw().is_complete());
    }

    #[test]
    fn test_pitch_bend() {
        let mut fw = Firmware::new();
        fw.voice_add(69, 100);
        let centre = fw.hw().phase_inc(NUM_OPERATORS - 1);

        // Full bend up with the default 2 semitone range
        fw.set_pitch_bend(0x1FFF);
        assert_eq!(fw.pitch_bend(), 169);
        fw.tick();
        let bent = frequency(fw.hw().phase_inc(NUM_OPERATORS - 1));
        let expected = frequency(centre) * 2.0_f64.powf(2.0 / 12.0);
        assert!((bent - expected).abs() < 2.0, "bent = {} Hz", bent);

        fw.set_pitch_bend(0);
        fw.tick();
        fw.tick();
        assert_eq!(fw.hw().phase_inc(NUM_OPERATORS - 1), centre);
    }

    #[test]
    fn test_lfo_amp_mod_reaches_egs() {
        let mut patch = Patch::default();
        patch.lfo.amp_mod_depth = 99;
        patch.lfo.speed = 50;
        patch.op[NUM_OPERATORS - 1].amp_mod_sensitivity = 3;

        let mut fw = Firmware::new();
        fw.load_voice(&patch);
        fw.voice_add(69, 100);

        let mut seen = 0u8;
        for _ in 0..400 {
            fw.tick();
            seen = seen.max(fw.hw().amp_mod());
        }
        assert!(seen > 0x80, "amp mod {:#x}", seen);
    }
}
