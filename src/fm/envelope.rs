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

//! Operator envelope generation
//!
//! Envelopes run in the attenuation domain: 0 is full level and 0xFFF is
//! silence. The OPS adds the 12-bit attenuation to the log-sine value before
//! the exponential lookup, so the envelope never needs a linear amplitude.
//!
//! Two capability traits separate what the OPS needs from an envelope
//! ([`EnvelopeGenerator`]) from the register interface the EGS programs
//! ([`RegisterEnvelope`]).

use super::tables::exp_19;

/// Number of programmable envelope segments (L1/R1 .. L4/R4)
pub const NUM_STAGES: usize = 4;

/// Largest 12-bit attenuation (silence)
pub const ATTEN_12_MAX: u32 = 0xFFF;

/// Attack segments move this many times faster than decay segments
const ATTACK_SPEEDUP: u32 = 4;

/// Envelope phase
///
/// Only Attack, Decay1, Decay2 and Release are programmed; Sustain and End
/// hold their level with a zero rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    /// Towards L1
    Attack = 0,
    /// Towards L2
    Decay1 = 1,
    /// Towards L3
    Decay2 = 2,
    /// Holding L3 while the key is down
    Sustain = 3,
    /// Towards L4 after key off
    Release = 4,
    /// Holding L4, terminal until the next key on
    End = 5,
}

impl Phase {
    /// Phase entered when the current segment reaches its target
    pub fn next(self) -> Phase {
        match self {
            Phase::Attack => Phase::Decay1,
            Phase::Decay1 => Phase::Decay2,
            Phase::Decay2 => Phase::Sustain,
            Phase::Sustain => Phase::Sustain,
            Phase::Release => Phase::End,
            Phase::End => Phase::End,
        }
    }

    /// Programmed stage whose level is the target of this phase
    pub fn stage(self) -> usize {
        match self {
            Phase::Attack => 0,
            Phase::Decay1 => 1,
            Phase::Decay2 | Phase::Sustain => 2,
            Phase::Release | Phase::End => 3,
        }
    }

    /// Whether the phase moves towards its target
    pub fn is_moving(self) -> bool {
        !matches!(self, Phase::Sustain | Phase::End)
    }
}

/// A sample-clocked envelope as seen by the OPS
pub trait EnvelopeGenerator {
    /// Start a note
    fn key_on(&mut self);

    /// Release a note
    fn key_off(&mut self);

    /// Advance the envelope by one sample
    fn step(&mut self);

    /// Current 12-bit attenuation including amplitude modulation
    fn atten12(&self) -> u32;

    /// Whether the envelope has reached its terminal phase
    fn is_complete(&self) -> bool;

    /// Advance one sample and return the new attenuation
    #[inline]
    fn next_atten12(&mut self) -> u32 {
        self.step();
        self.atten12()
    }
}

/// Envelope programmed through EGS registers
pub trait RegisterEnvelope: EnvelopeGenerator {
    /// Set the 8-bit target attenuation of a stage (0 = full level)
    fn set_atten8(&mut self, stage: usize, atten_8: u8);

    /// Set the 6-bit rate of a stage (values above 63 saturate)
    fn set_rate6(&mut self, stage: usize, rate_6: u8);

    /// Set the 12-bit amplitude modulation added to the output attenuation
    fn set_amp_mod(&mut self, amp_mod_12: u16);
}

/// Widen an 8-bit attenuation to the 24-bit internal domain
///
/// The low nibble repeats the high nibble so 0xFF reaches 0xFFF.
#[inline]
pub fn atten8_to_internal(atten_8: u8) -> u32 {
    let atten_8 = u32::from(atten_8);
    ((atten_8 << 4) | (atten_8 >> 4)) << 12
}

/// Attenuation-domain envelope generator (one per operator)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvGen {
    atten_8: [u8; NUM_STAGES],
    rate_6: [u8; NUM_STAGES],
    amp_mod_12: u32,

    internal: u32,
    target: u32,
    rate: u32,
    phase: Phase,
}

impl Default for EnvGen {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvGen {
    /// Create a silent envelope in the End phase
    pub fn new() -> Self {
        Self {
            atten_8: [0xFF; NUM_STAGES],
            rate_6: [0; NUM_STAGES],
            amp_mod_12: 0,
            internal: ATTEN_12_MAX << 12,
            target: ATTEN_12_MAX << 12,
            rate: 0,
            phase: Phase::End,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current 24-bit internal attenuation
    pub fn internal(&self) -> u32 {
        self.internal
    }

    /// 24-bit target of the current segment
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Per-sample increment of the current segment
    pub fn rate(&self) -> u32 {
        self.rate
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.load_segment();
    }

    /// Reload target and rate from the registers of the current phase
    fn load_segment(&mut self) {
        let stage = self.phase.stage();
        self.target = atten8_to_internal(self.atten_8[stage]);
        self.rate = if self.phase.is_moving() {
            exp_19(u32::from(self.rate_6[stage]))
        } else {
            0
        };
    }
}

impl EnvelopeGenerator for EnvGen {
    fn key_on(&mut self) {
        // Attenuation carries over from wherever the last note left it
        self.set_phase(Phase::Attack);
    }

    fn key_off(&mut self) {
        if self.phase < Phase::Release {
            self.set_phase(Phase::Release);
        }
    }

    #[inline]
    fn step(&mut self) {
        if self.rate == 0 {
            return;
        }

        if self.internal > self.target {
            let delta = self.rate * ATTACK_SPEEDUP;
            if self.internal - self.target > delta {
                self.internal -= delta;
                return;
            }
        } else if self.internal < self.target {
            if self.target - self.internal > self.rate {
                self.internal += self.rate;
                return;
            }
        }

        self.internal = self.target;
        self.set_phase(self.phase.next());
    }

    #[inline]
    fn atten12(&self) -> u32 {
        ((self.internal >> 12) + self.amp_mod_12).min(ATTEN_12_MAX)
    }

    fn is_complete(&self) -> bool {
        self.phase == Phase::End
    }
}

impl RegisterEnvelope for EnvGen {
    fn set_atten8(&mut self, stage: usize, atten_8: u8) {
        self.atten_8[stage] = atten_8;
        self.load_segment();
    }

    fn set_rate6(&mut self, stage: usize, rate_6: u8) {
        self.rate_6[stage] = rate_6.min(63);
        self.load_segment();
    }

    fn set_amp_mod(&mut self, amp_mod_12: u16) {
        self.amp_mod_12 = u32::from(amp_mod_12) & ATTEN_12_MAX;
    }
}
