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

//! Envelope generator (EGS) register model
//!
//! The EGS sits between the firmware and the OPS. The firmware writes patch
//! derived values into per-operator registers; the EGS combines them with
//! the per-note operator level, the voice pitch and the modulation inputs
//! and drives the envelope generators and frequency registers of the OPS.

use super::envelope::{EnvGen, EnvelopeGenerator, RegisterEnvelope, NUM_STAGES};
use super::operator::Ops;
use crate::NUM_OPERATORS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct EgStage {
    rate_6: u8,
    atten_8: u8,
}

/// Per-operator EGS registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EgsOpState {
    pitch_ratio_14: u16,
    is_pitch_fixed: bool,
    detune: i8,
    rate_scale_6: u8,
    eg: [EgStage; NUM_STAGES],
    amp_mod_sens_12: u16,
}

impl Default for EgsOpState {
    fn default() -> Self {
        Self {
            pitch_ratio_14: 0,
            is_pitch_fixed: false,
            detune: 0,
            rate_scale_6: 0,
            eg: [EgStage::default(); NUM_STAGES],
            amp_mod_sens_12: 0xFFF,
        }
    }
}

impl EgsOpState {
    /// Set pitch from patch (16-bit log pitch)
    pub fn set_pitch(&mut self, pitch_16: u16) {
        self.pitch_ratio_14 = pitch_16 >> 2;
    }

    /// Set pitch mode, fixed or ratio
    pub fn set_pitch_fixed(&mut self, is_pitch_fixed: bool) {
        self.is_pitch_fixed = is_pitch_fixed;
    }

    /// Set detune (-7..=7)
    pub fn set_detune(&mut self, detune: i8) {
        self.detune = detune;
    }

    /// Set EG target attenuation for a stage from a 6-bit value
    ///
    /// The two low bits of the 8-bit register are copied from the top two
    /// bits of the 6-bit value.
    pub fn set_eg_atten(&mut self, stage: usize, atten_6: u8) {
        let atten_6 = atten_6 & 0x3F;
        self.eg[stage].atten_8 = (atten_6 << 2) | (atten_6 >> 4);
    }

    /// Set EG rate for a stage
    pub fn set_eg_rate(&mut self, stage: usize, rate_6: u8) {
        self.eg[stage].rate_6 = rate_6 & 0x3F;
    }

    /// Set rate scaling (0-7)
    pub fn set_rate_scale(&mut self, scale_3: u8) {
        let scale_3 = scale_3 & 0x7;
        self.rate_scale_6 = (scale_3 << 3) | scale_3;
    }

    /// Rate scaling register (not applied to the envelope rates)
    pub fn rate_scale(&self) -> u8 {
        self.rate_scale_6
    }

    /// Set amplitude modulation sensitivity (0-3)
    pub fn set_amp_mod_sens(&mut self, sens_2: u8) {
        self.amp_mod_sens_12 = match sens_2 & 0b11 {
            0b00 => 0xFFF,
            0b01 => 0xAAA,
            0b10 => 0x555,
            _ => 0x000,
        };
    }

    /// Push per-stage attenuation combined with the note's operator level
    pub fn set_op_atten<E: RegisterEnvelope>(&self, eg: &mut E, op_atten_8: u8) {
        for (i, stage) in self.eg.iter().enumerate() {
            let atten_8 = (u16::from(stage.atten_8) + u16::from(op_atten_8)).min(0xFF);
            eg.set_atten8(i, atten_8 as u8);
        }
    }

    /// Push rates for a new note
    pub fn update_rates<E: RegisterEnvelope>(&self, eg: &mut E, _voice_pitch_14: u16) {
        // TODO: scale rates by rate_scale_6 and key once a hardware trace pins the curve
        for (i, stage) in self.eg.iter().enumerate() {
            eg.set_rate6(i, stage.rate_6);
        }
    }

    /// Push amplitude modulation, reduced by the sensitivity
    pub fn set_amp_mod<E: RegisterEnvelope>(&self, eg: &mut E, amp_mod_8: u8) {
        let amp_mod_12 = (i32::from(amp_mod_8) << 4) | (i32::from(amp_mod_8) >> 4);
        let amp_mod_12 = (amp_mod_12 - i32::from(self.amp_mod_sens_12)).max(0);
        eg.set_amp_mod(amp_mod_12 as u16);
    }

    /// Compute the 14-bit frequency value to send to the OPS
    pub fn compute_ops_freq14(&self, voice_pitch_14: u16, pitch_mod: i16) -> u32 {
        let mut pitch_14 = i32::from(self.pitch_ratio_14);

        if self.is_pitch_fixed {
            pitch_14 -= 0x1000;
        } else {
            pitch_14 += i32::from(voice_pitch_14);
        }

        pitch_14 += i32::from(self.detune) + i32::from(pitch_mod);

        (pitch_14 & 0x3FFF) as u32
    }
}

/// EGS register file driving a six operator OPS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Egs<E = EnvGen> {
    op: [EgsOpState; NUM_OPERATORS],
    ops: Ops<NUM_OPERATORS, E>,
    voice_pitch_14: u16,
    pitch_mod: i16,
    amp_mod: u8,
}

impl<E: RegisterEnvelope + Default> Default for Egs<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RegisterEnvelope + Default> Egs<E> {
    /// Create an EGS with all registers cleared
    pub fn new() -> Self {
        Self {
            op: [EgsOpState::default(); NUM_OPERATORS],
            ops: Ops::new(),
            voice_pitch_14: 0,
            pitch_mod: 0,
            amp_mod: 0,
        }
    }
}

impl<E: RegisterEnvelope> Egs<E> {
    /// Registers of the operator at `op_index` (0 = OP6)
    pub fn op_state(&self, op_index: usize) -> &EgsOpState {
        &self.op[op_index]
    }

    /// Set operator pitch (16-bit log pitch)
    pub fn set_op_pitch(&mut self, op_index: usize, pitch_16: u16) {
        self.op[op_index].set_pitch(pitch_16);
    }

    /// Set operator pitch mode
    pub fn set_op_pitch_fixed(&mut self, op_index: usize, fixed: bool) {
        self.op[op_index].set_pitch_fixed(fixed);
    }

    /// Set operator detune (-7..=7)
    pub fn set_op_detune(&mut self, op_index: usize, detune: i8) {
        self.op[op_index].set_detune(detune);
    }

    /// Set operator EG rate for a stage
    pub fn set_op_eg_rate(&mut self, op_index: usize, stage: usize, rate_6: u8) {
        self.op[op_index].set_eg_rate(stage, rate_6);
    }

    /// Set operator EG level (6-bit attenuation) for a stage
    pub fn set_op_eg_level(&mut self, op_index: usize, stage: usize, level_6: u8) {
        self.op[op_index].set_eg_atten(stage, level_6);
    }

    /// Set operator rate scaling
    pub fn set_op_rate_scaling(&mut self, op_index: usize, scale_3: u8) {
        self.op[op_index].set_rate_scale(scale_3);
    }

    /// Set operator amplitude modulation sensitivity
    pub fn set_op_amp_mod_sens(&mut self, op_index: usize, sens_2: u8) {
        self.op[op_index].set_amp_mod_sens(sens_2);
        self.op[op_index].set_amp_mod(self.ops.eg_mut(op_index), self.amp_mod);
    }

    /// Set the operator level for a new note and reload its envelope
    pub fn set_op_level(&mut self, op_index: usize, atten_8: u8) {
        let state = &self.op[op_index];
        let eg = self.ops.eg_mut(op_index);
        state.set_op_atten(eg, atten_8);
        state.update_rates(eg, self.voice_pitch_14);
    }

    /// Set the voice pitch (16-bit log pitch)
    pub fn set_voice_pitch(&mut self, pitch_16: u16) {
        self.voice_pitch_14 = pitch_16 >> 2;
    }

    /// Voice pitch in 14-bit log units
    pub fn voice_pitch(&self) -> u16 {
        self.voice_pitch_14
    }

    /// Set the pitch modulation (14-bit log units, signed)
    pub fn set_pitch_mod(&mut self, pitch_mod: i16) {
        self.pitch_mod = pitch_mod;
    }

    /// Current pitch modulation
    pub fn pitch_mod(&self) -> i16 {
        self.pitch_mod
    }

    /// Set the amplitude modulation of every operator
    pub fn set_amp_mod(&mut self, amp_mod_8: u8) {
        self.amp_mod = amp_mod_8;
        for (i, state) in self.op.iter().enumerate() {
            state.set_amp_mod(self.ops.eg_mut(i), amp_mod_8);
        }
    }

    /// Current amplitude modulation
    pub fn amp_mod(&self) -> u8 {
        self.amp_mod
    }

    /// Recompute and send all operator frequencies to the OPS
    pub fn send_freq(&mut self) {
        for (i, state) in self.op.iter().enumerate() {
            let freq_14 = state.compute_ops_freq14(self.voice_pitch_14, self.pitch_mod);
            self.ops.set_freq(i, freq_14);
        }
    }

    /// Set the OPS oscillator sync mode
    pub fn set_sync(&mut self, sync: bool) {
        self.ops.set_sync(sync);
    }

    /// Select the OPS algorithm
    pub fn set_algorithm(&mut self, algorithm: u8) {
        self.ops.set_algorithm(algorithm);
    }

    /// Set the OPS feedback level
    pub fn set_feedback(&mut self, feedback: u8) {
        self.ops.set_feedback(feedback);
    }

    /// Start of note
    pub fn key_on(&mut self) {
        self.ops.key_on();
        for i in 0..NUM_OPERATORS {
            self.ops.eg_mut(i).key_on();
        }
    }

    /// Release of note
    pub fn key_off(&mut self) {
        for i in 0..NUM_OPERATORS {
            self.ops.eg_mut(i).key_off();
        }
    }

    /// Check if all amplitude envelopes are at L4
    ///
    /// Not something a real DX7 reports; used to free voices.
    pub fn is_complete(&self) -> bool {
        self.ops.egs().all(|eg| eg.is_complete())
    }

    /// Envelope generator of the operator at `op_index`
    pub fn eg(&self, op_index: usize) -> &E {
        self.ops.eg(op_index)
    }

    /// Mutable envelope generator of the operator at `op_index`
    pub fn eg_mut(&mut self, op_index: usize) -> &mut E {
        self.ops.eg_mut(op_index)
    }

    /// Frequency register (phase increment) of the operator at `op_index`
    pub fn phase_inc(&self, op_index: usize) -> u32 {
        self.ops.phase_inc(op_index)
    }

    /// Selected algorithm
    pub fn algorithm(&self) -> usize {
        self.ops.algorithm()
    }

    /// Next audio sample
    #[inline]
    pub fn sample(&mut self) -> i32 {
        self.ops.sample()
    }
}
