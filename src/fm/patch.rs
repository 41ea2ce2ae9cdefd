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

//! DX7 patch data structures
//!
//! A [`Patch`] is the full parameter set of one voice as the DX7 stores it.
//! Operators are kept in SysEx order: `op[0]` is OP6 and `op[5]` is OP1.
//!
//! Two byte layouts exist:
//!
//! * the packed 128 byte layout used in 32 voice bulk dumps and ROM cartridges,
//!   where several small fields share a byte, and
//! * the unpacked 155 byte layout used by the single voice edit buffer, one
//!   parameter per byte. The in-memory voice has a 156th byte (operator on/off
//!   mask) which the edit buffer message does not carry.
//!
//! Decoding never rejects field values: each field is masked to its bit width
//! and clamped to its documented range.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::lfo::LfoWaveform;
use crate::NUM_OPERATORS;

/// Size of packed patch data
pub const SYX_SIZE: usize = 128;

/// Size of unpacked patch data as carried by the edit buffer message
pub const UNPACKED_SIZE: usize = 155;

/// Size of unpacked patch data including the operator on/off mask
pub const UNPACKED_SIZE_WITH_ENABLE: usize = 156;

/// Number of patches in a bank
pub const BANK_PATCHES: usize = 32;

/// Length of a patch name
pub const NAME_LEN: usize = 10;

const PACKED_OP_SIZE: usize = 17;
const UNPACKED_OP_SIZE: usize = 21;

/// All operators enabled
pub const ALL_OPERATORS: u8 = 0x3F;

/// DX7 envelope parameters (4-stage)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Rate for each of the 4 envelope stages (0-99)
    pub rate: [u8; 4],
    /// Level for each of the 4 envelope stages (0-99)
    pub level: [u8; 4],
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            rate: [99, 99, 99, 99],
            level: [99, 99, 99, 0],
        }
    }
}

/// Keyboard level scaling curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScaleCurve {
    /// Linear, attenuating away from the break point
    #[default]
    NegLin = 0,
    /// Exponential, attenuating away from the break point
    NegExp = 1,
    /// Exponential, boosting away from the break point
    PosExp = 2,
    /// Linear, boosting away from the break point
    PosLin = 3,
}

impl From<u8> for ScaleCurve {
    fn from(value: u8) -> Self {
        match value & 0x3 {
            0 => ScaleCurve::NegLin,
            1 => ScaleCurve::NegExp,
            2 => ScaleCurve::PosExp,
            _ => ScaleCurve::PosLin,
        }
    }
}

impl ScaleCurve {
    /// Whether the curve boosts level away from the break point
    pub fn is_positive(self) -> bool {
        matches!(self, ScaleCurve::PosExp | ScaleCurve::PosLin)
    }

    /// Whether the curve is linear
    pub fn is_linear(self) -> bool {
        matches!(self, ScaleCurve::NegLin | ScaleCurve::PosLin)
    }
}

/// Keyboard scaling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardScaling {
    /// Break point key (0-99, 39 = C3)
    pub break_point: u8,
    /// Depth of scaling on the left side of break point
    pub left_depth: u8,
    /// Depth of scaling on the right side of break point
    pub right_depth: u8,
    /// Curve type for left side
    pub left_curve: ScaleCurve,
    /// Curve type for right side
    pub right_curve: ScaleCurve,
}

impl Default for KeyboardScaling {
    fn default() -> Self {
        Self {
            break_point: 39,
            left_depth: 0,
            right_depth: 0,
            left_curve: ScaleCurve::NegLin,
            right_curve: ScaleCurve::NegLin,
        }
    }
}

/// Oscillator frequency mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum OscMode {
    /// Frequency follows the key
    #[default]
    Ratio = 0,
    /// Frequency is fixed
    Fixed = 1,
}

impl From<u8> for OscMode {
    fn from(value: u8) -> Self {
        if value & 0x1 == 0 {
            OscMode::Ratio
        } else {
            OscMode::Fixed
        }
    }
}

/// DX7 operator parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// Amplitude envelope
    pub envelope: Envelope,
    /// Keyboard scaling settings
    pub keyboard_scaling: KeyboardScaling,
    /// Rate scaling (0-7)
    pub rate_scaling: u8,
    /// Amplitude modulation sensitivity (0-3)
    pub amp_mod_sensitivity: u8,
    /// Velocity sensitivity (0-7)
    pub velocity_sensitivity: u8,
    /// Output level (0-99)
    pub level: u8,
    /// Oscillator mode
    pub mode: OscMode,
    /// Coarse frequency (0-31)
    pub coarse: u8,
    /// Fine frequency (0-99)
    pub fine: u8,
    /// Detune (0-14, 7 is centre)
    pub detune: u8,
}

impl Default for Operator {
    fn default() -> Self {
        Self {
            envelope: Envelope::default(),
            keyboard_scaling: KeyboardScaling::default(),
            rate_scaling: 0,
            amp_mod_sensitivity: 0,
            velocity_sensitivity: 0,
            level: 0,
            mode: OscMode::Ratio,
            coarse: 1,
            fine: 0,
            detune: 7,
        }
    }
}

/// LFO parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LfoParams {
    /// Speed (0-99)
    pub speed: u8,
    /// Delay (0-99)
    pub delay: u8,
    /// Pitch modulation depth (0-99)
    pub pitch_mod_depth: u8,
    /// Amplitude modulation depth (0-99)
    pub amp_mod_depth: u8,
    /// Restart the LFO on key on
    pub sync: bool,
    /// Waveform
    pub waveform: LfoWaveform,
    /// Pitch modulation sensitivity (0-7)
    pub pitch_mod_sense: u8,
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            speed: 35,
            delay: 0,
            pitch_mod_depth: 0,
            amp_mod_depth: 0,
            sync: true,
            waveform: LfoWaveform::Triangle,
            pitch_mod_sense: 3,
        }
    }
}

/// Complete DX7 patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    /// Six operators, OP6 first
    pub op: [Operator; NUM_OPERATORS],
    /// Pitch envelope
    pub pitch_envelope: Envelope,
    /// Algorithm number (0-31)
    pub algorithm: u8,
    /// Feedback amount (0-7)
    pub feedback: u8,
    /// Reset oscillator phases on key on
    pub osc_sync: bool,
    /// LFO parameters
    pub lfo: LfoParams,
    /// Transpose (0-48, 24 = C3)
    pub transpose: u8,
    /// Patch name
    #[serde(with = "name_serde")]
    pub name: [u8; NAME_LEN],
    /// Operator on/off mask, bit 0 is OP6
    pub op_enable: u8,
}

impl Default for Patch {
    fn default() -> Self {
        let mut op = [Operator::default(); NUM_OPERATORS];
        op[NUM_OPERATORS - 1].level = 99;

        Self {
            op,
            pitch_envelope: Envelope {
                rate: [99; 4],
                level: [50; 4],
            },
            algorithm: 0,
            feedback: 0,
            osc_sync: true,
            lfo: LfoParams::default(),
            transpose: 24,
            name: *b"INIT VOICE",
            op_enable: ALL_OPERATORS,
        }
    }
}

impl Patch {
    /// Creates a new patch from packed SysEx bytes.
    pub fn new(data: &[u8; SYX_SIZE]) -> Self {
        let mut ret = Self::default();
        ret.unpack(data);
        ret
    }

    /// Patch name with trailing padding removed
    pub fn name(&self) -> String {
        name_to_string(&self.name)
    }

    /// Set the patch name, padding or truncating to 10 characters
    pub fn set_name(&mut self, name: &str) {
        self.name = string_to_name(name);
    }

    /// Operator by its documented number (1-6)
    pub fn operator(&self, number: usize) -> &Operator {
        &self.op[NUM_OPERATORS - number.clamp(1, NUM_OPERATORS)]
    }

    /// Whether the operator at SysEx index `index` (0 = OP6) is enabled
    pub fn is_enabled(&self, index: usize) -> bool {
        self.op_enable & (1 << index) != 0
    }

    /// Unpacks a DX7 SysEx patch from packed bytes
    fn unpack(&mut self, data: &[u8; SYX_SIZE]) {
        for i in 0..NUM_OPERATORS {
            let o = &mut self.op[i];
            let op_data = &data[i * PACKED_OP_SIZE..(i + 1) * PACKED_OP_SIZE];

            for j in 0..4 {
                o.envelope.rate[j] = (op_data[j] & 0x7f).min(99);
                o.envelope.level[j] = (op_data[4 + j] & 0x7f).min(99);
            }

            o.keyboard_scaling.break_point = (op_data[8] & 0x7f).min(99);
            o.keyboard_scaling.left_depth = (op_data[9] & 0x7f).min(99);
            o.keyboard_scaling.right_depth = (op_data[10] & 0x7f).min(99);
            o.keyboard_scaling.left_curve = ScaleCurve::from(op_data[11]);
            o.keyboard_scaling.right_curve = ScaleCurve::from(op_data[11] >> 2);

            o.rate_scaling = op_data[12] & 0x7;
            o.detune = ((op_data[12] >> 3) & 0xf).min(14);
            o.amp_mod_sensitivity = op_data[13] & 0x3;
            o.velocity_sensitivity = (op_data[13] >> 2) & 0x7;
            o.level = (op_data[14] & 0x7f).min(99);
            o.mode = OscMode::from(op_data[15]);
            o.coarse = (op_data[15] >> 1) & 0x1f;
            o.fine = (op_data[16] & 0x7f).min(99);
        }

        for j in 0..4 {
            self.pitch_envelope.rate[j] = (data[102 + j] & 0x7f).min(99);
            self.pitch_envelope.level[j] = (data[106 + j] & 0x7f).min(99);
        }

        self.algorithm = data[110] & 0x1f;
        self.feedback = data[111] & 0x7;
        self.osc_sync = (data[111] >> 3) & 0x1 != 0;

        self.lfo.speed = (data[112] & 0x7f).min(99);
        self.lfo.delay = (data[113] & 0x7f).min(99);
        self.lfo.pitch_mod_depth = (data[114] & 0x7f).min(99);
        self.lfo.amp_mod_depth = (data[115] & 0x7f).min(99);
        self.lfo.sync = data[116] & 0x1 != 0;
        self.lfo.waveform = LfoWaveform::from((data[116] >> 1) & 0x7);
        self.lfo.pitch_mod_sense = (data[116] >> 4) & 0x7;

        self.transpose = (data[117] & 0x7f).min(48);

        for i in 0..NAME_LEN {
            self.name[i] = data[118 + i] & 0x7f;
        }

        self.op_enable = ALL_OPERATORS;
    }

    /// Packs the patch into the 128 byte bulk dump layout
    pub fn pack(&self) -> [u8; SYX_SIZE] {
        let mut data = [0u8; SYX_SIZE];

        for (i, o) in self.op.iter().enumerate() {
            let op_data = &mut data[i * PACKED_OP_SIZE..(i + 1) * PACKED_OP_SIZE];

            op_data[..4].copy_from_slice(&o.envelope.rate);
            op_data[4..8].copy_from_slice(&o.envelope.level);
            op_data[8] = o.keyboard_scaling.break_point;
            op_data[9] = o.keyboard_scaling.left_depth;
            op_data[10] = o.keyboard_scaling.right_depth;
            op_data[11] =
                (o.keyboard_scaling.left_curve as u8) | ((o.keyboard_scaling.right_curve as u8) << 2);
            op_data[12] = (o.rate_scaling & 0x7) | ((o.detune & 0xf) << 3);
            op_data[13] = (o.amp_mod_sensitivity & 0x3) | ((o.velocity_sensitivity & 0x7) << 2);
            op_data[14] = o.level;
            op_data[15] = (o.mode as u8) | ((o.coarse & 0x1f) << 1);
            op_data[16] = o.fine;
        }

        data[102..106].copy_from_slice(&self.pitch_envelope.rate);
        data[106..110].copy_from_slice(&self.pitch_envelope.level);
        data[110] = self.algorithm & 0x1f;
        data[111] = (self.feedback & 0x7) | (u8::from(self.osc_sync) << 3);
        data[112] = self.lfo.speed;
        data[113] = self.lfo.delay;
        data[114] = self.lfo.pitch_mod_depth;
        data[115] = self.lfo.amp_mod_depth;
        data[116] = u8::from(self.lfo.sync)
            | ((self.lfo.waveform as u8) << 1)
            | ((self.lfo.pitch_mod_sense & 0x7) << 4);
        data[117] = self.transpose;
        data[118..128].copy_from_slice(&self.name);

        for byte in data.iter_mut() {
            *byte &= 0x7f;
        }

        data
    }

    /// Decodes the unpacked layout (155 bytes, or 156 with the operator mask)
    pub fn from_unpacked(data: &[u8]) -> Result<Self> {
        if data.len() != UNPACKED_SIZE && data.len() != UNPACKED_SIZE_WITH_ENABLE {
            bail!(
                "unpacked voice must be {} or {} bytes, got {}",
                UNPACKED_SIZE,
                UNPACKED_SIZE_WITH_ENABLE,
                data.len()
            );
        }

        let field = |index: usize, max: u8| (data[index] & 0x7f).min(max);
        let mut patch = Self::default();

        for (i, o) in patch.op.iter_mut().enumerate() {
            let base = i * UNPACKED_OP_SIZE;

            for j in 0..4 {
                o.envelope.rate[j] = field(base + j, 99);
                o.envelope.level[j] = field(base + 4 + j, 99);
            }
            o.keyboard_scaling.break_point = field(base + 8, 99);
            o.keyboard_scaling.left_depth = field(base + 9, 99);
            o.keyboard_scaling.right_depth = field(base + 10, 99);
            o.keyboard_scaling.left_curve = ScaleCurve::from(data[base + 11]);
            o.keyboard_scaling.right_curve = ScaleCurve::from(data[base + 12]);
            o.rate_scaling = field(base + 13, 7);
            o.amp_mod_sensitivity = field(base + 14, 3);
            o.velocity_sensitivity = field(base + 15, 7);
            o.level = field(base + 16, 99);
            o.mode = OscMode::from(data[base + 17]);
            o.coarse = field(base + 18, 31);
            o.fine = field(base + 19, 99);
            o.detune = field(base + 20, 14);
        }

        for j in 0..4 {
            patch.pitch_envelope.rate[j] = field(126 + j, 99);
            patch.pitch_envelope.level[j] = field(130 + j, 99);
        }
        patch.algorithm = field(134, 31);
        patch.feedback = field(135, 7);
        patch.osc_sync = data[136] & 0x1 != 0;
        patch.lfo.speed = field(137, 99);
        patch.lfo.delay = field(138, 99);
        patch.lfo.pitch_mod_depth = field(139, 99);
        patch.lfo.amp_mod_depth = field(140, 99);
        patch.lfo.sync = data[141] & 0x1 != 0;
        patch.lfo.waveform = LfoWaveform::from(field(142, 5));
        patch.lfo.pitch_mod_sense = field(143, 7);
        patch.transpose = field(144, 48);
        for i in 0..NAME_LEN {
            patch.name[i] = data[145 + i] & 0x7f;
        }

        patch.op_enable = match data.get(UNPACKED_SIZE) {
            Some(mask) => mask & ALL_OPERATORS,
            None => ALL_OPERATORS,
        };

        Ok(patch)
    }

    /// Encodes the 155 byte unpacked layout (no operator mask)
    pub fn to_unpacked(&self) -> [u8; UNPACKED_SIZE] {
        let mut data = [0u8; UNPACKED_SIZE];

        for (i, o) in self.op.iter().enumerate() {
            let base = i * UNPACKED_OP_SIZE;

            data[base..base + 4].copy_from_slice(&o.envelope.rate);
            data[base + 4..base + 8].copy_from_slice(&o.envelope.level);
            data[base + 8] = o.keyboard_scaling.break_point;
            data[base + 9] = o.keyboard_scaling.left_depth;
            data[base + 10] = o.keyboard_scaling.right_depth;
            data[base + 11] = o.keyboard_scaling.left_curve as u8;
            data[base + 12] = o.keyboard_scaling.right_curve as u8;
            data[base + 13] = o.rate_scaling;
            data[base + 14] = o.amp_mod_sensitivity;
            data[base + 15] = o.velocity_sensitivity;
            data[base + 16] = o.level;
            data[base + 17] = o.mode as u8;
            data[base + 18] = o.coarse;
            data[base + 19] = o.fine;
            data[base + 20] = o.detune;
        }

        data[126..130].copy_from_slice(&self.pitch_envelope.rate);
        data[130..134].copy_from_slice(&self.pitch_envelope.level);
        data[134] = self.algorithm;
        data[135] = self.feedback;
        data[136] = u8::from(self.osc_sync);
        data[137] = self.lfo.speed;
        data[138] = self.lfo.delay;
        data[139] = self.lfo.pitch_mod_depth;
        data[140] = self.lfo.amp_mod_depth;
        data[141] = u8::from(self.lfo.sync);
        data[142] = self.lfo.waveform as u8;
        data[143] = self.lfo.pitch_mod_sense;
        data[144] = self.transpose;
        data[145..155].copy_from_slice(&self.name);

        for byte in data.iter_mut() {
            *byte &= 0x7f;
        }

        data
    }

    /// Encodes the unpacked layout followed by the operator on/off mask
    pub fn to_unpacked_with_enable(&self) -> [u8; UNPACKED_SIZE_WITH_ENABLE] {
        let mut data = [0u8; UNPACKED_SIZE_WITH_ENABLE];
        data[..UNPACKED_SIZE].copy_from_slice(&self.to_unpacked());
        data[UNPACKED_SIZE] = self.op_enable & ALL_OPERATORS;
        data
    }
}

/// A bank of 32 dx7 patches.
#[derive(Debug, Clone)]
pub struct PatchBank {
    /// The array of 32 patches.
    pub patches: [Patch; BANK_PATCHES],
}

impl Default for PatchBank {
    fn default() -> Self {
        Self {
            patches: [Patch::default(); BANK_PATCHES],
        }
    }
}

impl PatchBank {
    /// Size of the packed voice data of a bank
    pub const PACKED_SIZE: usize = BANK_PATCHES * SYX_SIZE;

    /// Parse 32 packed voices (4096 bytes, no SysEx framing)
    pub fn from_packed(data: &[u8]) -> Result<PatchBank> {
        if data.len() != Self::PACKED_SIZE {
            bail!(
                "bank voice data must be {} bytes, got {}",
                Self::PACKED_SIZE,
                data.len()
            );
        }

        let mut bank = PatchBank::default();
        for (patch, chunk) in bank.patches.iter_mut().zip(data.chunks_exact(SYX_SIZE)) {
            let mut packed = [0u8; SYX_SIZE];
            packed.copy_from_slice(chunk);
            *patch = Patch::new(&packed);
        }

        Ok(bank)
    }

    /// Pack all 32 voices (4096 bytes, no SysEx framing)
    pub fn to_packed(&self) -> Vec<u8> {
        self.patches.iter().flat_map(|patch| patch.pack()).collect()
    }
}

/// Controller ranges and assignments from the function parameter block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParams {
    /// Mod wheel range (0-99)
    pub mod_wheel_range: u8,
    /// Mod wheel assign (bit 0 pitch, bit 1 amp, bit 2 EG bias)
    pub mod_wheel_assign: u8,
    /// Foot controller range (0-99)
    pub foot_control_range: u8,
    /// Foot controller assign
    pub foot_control_assign: u8,
    /// Breath controller range (0-99)
    pub breath_control_range: u8,
    /// Breath controller assign
    pub breath_control_assign: u8,
    /// Aftertouch range (0-99)
    pub after_touch_range: u8,
    /// Aftertouch assign
    pub after_touch_assign: u8,
    /// Pitch bend range in semitones (0-12)
    pub pitch_bend_range: u8,
}

impl Default for FunctionParams {
    fn default() -> Self {
        Self {
            mod_wheel_range: 99,
            mod_wheel_assign: 0b001,
            foot_control_range: 0,
            foot_control_assign: 0,
            breath_control_range: 0,
            breath_control_assign: 0,
            after_touch_range: 0,
            after_touch_assign: 0,
            pitch_bend_range: 2,
        }
    }
}

fn name_to_string(name: &[u8; NAME_LEN]) -> String {
    name.iter()
        .map(|&c| if (0x20..0x7f).contains(&c) { c as char } else { ' ' })
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn string_to_name(name: &str) -> [u8; NAME_LEN] {
    let mut out = [b' '; NAME_LEN];
    for (dst, c) in out.iter_mut().zip(name.chars()) {
        *dst = if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' };
    }
    out
}

mod name_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{name_to_string, string_to_name, NAME_LEN};

    pub fn serialize<S: Serializer>(name: &[u8; NAME_LEN], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&name_to_string(name))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; NAME_LEN], D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(string_to_name(&name))
    }
}
