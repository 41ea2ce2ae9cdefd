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

//! Various "magic" conversion functions for DX7 patch data
//!
//! Integer conversions performed by the firmware when a patch is activated
//! or a note is added. All arithmetic matches the 8-bit firmware, including
//! its truncations.

use super::constants::{
    KBD_SCALING_CURVE_EXP, KBD_SCALING_CURVE_LIN, KBD_SCALING_GROUPS, KEY_PITCH,
    KEY_VELOCITY_SENSE_STEP, LOG_LEVEL, MIDI_VELOCITY, OP_FREQ_COARSE, OP_FREQ_FINE,
    OP_FREQ_FIXED, OP_FREQ_FIXED_FINE_STEP, OP_FREQ_FIXED_OFFSET, OP_FREQ_RATIO_OFFSET,
    OP_VOLUME_VELOCITY_SCALE,
};
use super::patch::{KeyboardScaling, OscMode, Operator, ScaleCurve};

/// Convert an operator envelope rate from 0-99 to the 6-bit EGS rate
///
/// * 0 => 0
/// * 50 => 32
/// * 99 => 63
#[inline]
pub fn eg_rate6(rate: u8) -> u8 {
    ((u16::from(rate.min(99)) * 164) >> 8) as u8
}

/// Convert an operator envelope level from 0-99 to the 6-bit EGS attenuation
///
/// * 0 => 0x3F (silent)
/// * 99 => 0x00
#[inline]
pub fn eg_level6(level: u8) -> u8 {
    LOG_LEVEL[usize::from(level.min(99))] >> 1
}

/// Scale a 0-99 depth or range to 0-255
#[inline]
pub fn scale_depth(depth: u8) -> u8 {
    ((u16::from(depth.min(99)) * 660) >> 8) as u8
}

/// Convert a MIDI note to the 16-bit log pitch used by the EGS
///
/// The two low bits of the key pitch ROM entry are replicated to fill the
/// low byte.
#[inline]
pub fn key_pitch(note: u8) -> u16 {
    let value = u16::from(KEY_PITCH[usize::from(note.min(127))]);
    let ls_bits = value & 0b11;
    (value << 8) | (ls_bits << 6) | (ls_bits << 4) | (ls_bits << 2)
}

/// Operator pitch register and fixed-frequency flag
#[inline]
pub fn op_pitch(op: &Operator) -> (u16, bool) {
    match op.mode {
        OscMode::Ratio => {
            let pitch = OP_FREQ_COARSE[usize::from(op.coarse & 0x1F)]
                .wrapping_add(OP_FREQ_FINE[usize::from(op.fine.min(99))])
                .wrapping_add(OP_FREQ_RATIO_OFFSET);
            (pitch, false)
        }
        OscMode::Fixed => {
            let pitch = OP_FREQ_FIXED[usize::from(op.coarse & 0b11)]
                .wrapping_add(u16::from(op.fine.min(99)) * OP_FREQ_FIXED_FINE_STEP)
                .wrapping_add(OP_FREQ_FIXED_OFFSET);
            (pitch, true)
        }
    }
}

/// Centred detune (-7..=7)
#[inline]
pub fn op_detune(op: &Operator) -> i8 {
    op.detune.min(14) as i8 - 7
}

/// Velocity sensitivity word (high byte whole, low byte scaled by velocity)
#[inline]
pub fn key_velocity_sense(velocity_sensitivity: u8) -> u16 {
    (8 - u16::from(velocity_sensitivity.min(7))) * KEY_VELOCITY_SENSE_STEP
}

/// Convert MIDI velocity (0-127) to the firmware's internal velocity
///
/// * 0 => 0x6E
/// * 127 => 0x00
#[inline]
pub fn midi_velocity(velocity: u8) -> u8 {
    MIDI_VELOCITY[usize::from(velocity.min(127) >> 2)]
}

/// Attenuation contributed by velocity for one operator
#[inline]
pub fn velocity_atten(vel_sense: u16, velocity: u8) -> u8 {
    let scale = u16::from(OP_VOLUME_VELOCITY_SCALE[usize::from(velocity >> 2) & 0x1F]);
    let vol = ((vel_sense & 0xFF00) as u32 + u32::from(scale) * u32::from(vel_sense & 0xFF)) >> 8;
    vol.min(0xFF) as u8
}

/// Keyboard scaling group (0-42) for a MIDI note
#[inline]
pub fn kbd_scaling_group(note: u8) -> usize {
    (usize::from(KEY_PITCH[usize::from(note.min(127))]) >> 2).min(KBD_SCALING_GROUPS - 1)
}

#[inline]
fn curve_value(curve: ScaleCurve, distance: usize, depth: u8) -> i16 {
    let table = if curve.is_linear() {
        &KBD_SCALING_CURVE_LIN
    } else {
        &KBD_SCALING_CURVE_EXP
    };
    let value = ((u32::from(table[distance.min(table.len() - 1)]) * u32::from(depth)) >> 8) as i16;

    // Positive curves raise the level, so they remove attenuation
    if curve.is_positive() {
        -value
    } else {
        value
    }
}

/// Per-group output attenuation (7-bit domain, unclamped) for an operator
///
/// Combines the operator output level with keyboard level scaling for each
/// of the 43 keyboard groups.
pub fn kbd_scaling(out_level: u8, ks: &KeyboardScaling) -> [i16; KBD_SCALING_GROUPS] {
    let breakpoint = usize::from(KEY_PITCH[usize::from(ks.break_point.min(99)) + 20] >> 2);
    let depth_left = scale_depth(ks.left_depth);
    let depth_right = scale_depth(ks.right_depth);
    let out = i16::from(LOG_LEVEL[usize::from(out_level.min(99))]);

    let mut op_out = [0; KBD_SCALING_GROUPS];
    for (group, entry) in op_out.iter_mut().enumerate() {
        let curve = if group <= breakpoint {
            curve_value(ks.left_curve, breakpoint - group, depth_left)
        } else {
            curve_value(ks.right_curve, group - breakpoint, depth_right)
        };
        *entry = out + curve;
    }
    op_out
}

/// Combine scaled output level and velocity into the 8-bit operator attenuation
#[inline]
pub fn op_atten8(op_out: i16, velocity_atten: u8) -> u8 {
    let level = op_out.clamp(0, 0x7F) as u16;
    (level * 2 + u16::from(velocity_atten)).min(0xFF) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eg_rate6() {
        assert_eq!(eg_rate6(0), 0);
        assert_eq!(eg_rate6(50), 32);
        assert_eq!(eg_rate6(99), 63);
        assert_eq!(eg_rate6(120), 63);
    }

    #[test]
    fn test_eg_level6_monotonic() {
        assert_eq!(eg_level6(0), 0x3F);
        assert_eq!(eg_level6(99), 0x00);
        for level in 1..=99 {
            assert!(eg_level6(level) <= eg_level6(level - 1));
        }
    }

    #[test]
    fn test_key_pitch_a4() {
        assert_eq!(key_pitch(69), 0x5AA8);
        assert!(key_pitch(81) > key_pitch(69));
    }

    #[test]
    fn test_ratio_one_pitch() {
        let op = Operator::default();
        assert_eq!(op_pitch(&op), (0x232C, false));
        assert_eq!(op_detune(&op), 0);
    }

    #[test]
    fn test_fixed_pitch() {
        let op = Operator {
            mode: OscMode::Fixed,
            coarse: 5,
            fine: 2,
            ..Operator::default()
        };
        assert_eq!(op_pitch(&op), (0x3526 + 272 + 0x16AC, true));
    }

    #[test]
    fn test_velocity_atten() {
        let insensitive = key_velocity_sense(0);
        let sensitive = key_velocity_sense(7);
        assert_eq!(insensitive, 8 * 0x1E0);
        assert_eq!(sensitive, 0x1E0);

        assert_eq!(
            velocity_atten(insensitive, midi_velocity(0)),
            velocity_atten(insensitive, midi_velocity(127))
        );
        assert_eq!(velocity_atten(sensitive, midi_velocity(127)), 0x01);
        assert_eq!(velocity_atten(sensitive, midi_velocity(0)), 0x71);
    }

    #[test]
    fn test_kbd_scaling_flat_without_depth() {
        let ks = KeyboardScaling::default();
        let out = kbd_scaling(99, &ks);
        assert!(out.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_kbd_scaling_curves() {
        let ks = KeyboardScaling {
            break_point: 39,
            left_depth: 99,
            right_depth: 99,
            left_curve: ScaleCurve::NegLin,
            right_curve: ScaleCurve::PosExp,
        };
        let out = kbd_scaling(50, &ks);
        let bp = usize::from(KEY_PITCH[59] >> 2);
        let centre = out[bp];

        assert!(out[0] > centre);
        assert!(out[KBD_SCALING_GROUPS - 1] < centre);
    }

    #[test]
    fn test_op_atten8_clamps() {
        assert_eq!(op_atten8(-20, 0), 0);
        assert_eq!(op_atten8(0x7F, 0x00), 0xFE);
        assert_eq!(op_atten8(0x7F, 0x10), 0xFF);
        assert_eq!(op_atten8(0x10, 0x08), 0x28);
    }
}
