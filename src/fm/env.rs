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

//! Table-driven envelope generation
//!
//! This is the simpler of the two envelope lineages. It is programmed
//! directly from the 0-99 patch values, without going through the firmware
//! and EGS register translation, and tracks a 30-bit amplitude rather than an
//! attenuation. It is useful where a voice is driven straight from a patch.

use super::constants::LOG_LEVEL;
use super::envelope::{EnvelopeGenerator, Phase, ATTEN_12_MAX};
use super::patch::Envelope;
use super::tables::exp_19;

/// Full scale of the 30-bit amplitude
const AMPL_30_MAX: u32 = (1 << 30) - 1;

/// Rising segments move this many times faster than falling ones
const RISE_SPEEDUP: u32 = 4;

/// Convert a 0-99 level to a 30-bit amplitude
#[inline]
pub fn level_30(level: u8) -> u32 {
    let log = u32::from(LOG_LEVEL[usize::from(level.min(99))] >> 1);
    (0x3F - log) << 24
}

/// Convert a 0-99 rate to a 30-bit amplitude increment
#[inline]
pub fn rate_30(rate: u8) -> u32 {
    exp_19((u32::from(rate.min(99)) * 164) >> 8) << 6
}

/// Envelope generator programmed from patch values
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableEnvGen {
    levels: [u32; 6],
    rates: [u32; 6],

    ampl: u32,
    level: u32,
    rate: u32,
    rising: bool,
    phase: Phase,
}

impl Default for TableEnvGen {
    fn default() -> Self {
        Self::new()
    }
}

impl TableEnvGen {
    /// Create a silent envelope
    pub fn new() -> Self {
        Self {
            levels: [0; 6],
            rates: [0; 6],
            ampl: 0,
            level: 0,
            rate: 0,
            rising: false,
            phase: Phase::End,
        }
    }

    /// Program levels and rates, scaling levels by the operator output level
    pub fn program(&mut self, envelope: &Envelope, out_level: u8) {
        let out_level = u32::from(out_level.min(99));

        for stage in 0..4 {
            let phase = if stage == 3 { Phase::Release } else { phase_for(stage) };
            let level = (u32::from(envelope.level[stage].min(99)) * out_level / 100) as u8;

            self.levels[phase as usize] = level_30(level);
            self.rates[phase as usize] = rate_30(envelope.rate[stage]);
        }

        self.levels[Phase::Sustain as usize] = self.levels[Phase::Decay2 as usize];
        self.rates[Phase::Sustain as usize] = 0;
        self.levels[Phase::End as usize] = self.levels[Phase::Release as usize];
        self.rates[Phase::End as usize] = 0;
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current 30-bit amplitude
    pub fn amplitude(&self) -> u32 {
        self.ampl
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.level = self.levels[phase as usize];
        self.rising = self.ampl < self.level;
        self.rate = self.rates[phase as usize];
        if self.rising {
            self.rate *= RISE_SPEEDUP;
        }
    }
}

fn phase_for(stage: usize) -> Phase {
    match stage {
        0 => Phase::Attack,
        1 => Phase::Decay1,
        _ => Phase::Decay2,
    }
}

impl EnvelopeGenerator for TableEnvGen {
    fn key_on(&mut self) {
        self.ampl = self.levels[Phase::Release as usize];
        self.set_phase(Phase::Attack);
    }

    fn key_off(&mut self) {
        if self.phase < Phase::Release {
            self.set_phase(Phase::Release);
        }
    }

    fn step(&mut self) {
        if !self.phase.is_moving() {
            return;
        }

        let reached = if self.rising {
            self.ampl = self.ampl.saturating_add(self.rate);
            self.ampl >= self.level
        } else {
            self.ampl = self.ampl.saturating_sub(self.rate);
            self.ampl <= self.level
        };

        if reached {
            self.ampl = self.level;
            self.set_phase(self.phase.next());
        }
    }

    fn atten12(&self) -> u32 {
        ((AMPL_30_MAX - self.ampl.min(AMPL_30_MAX)) >> 18).min(ATTEN_12_MAX)
    }

    fn is_complete(&self) -> bool {
        self.phase == Phase::End
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brass() -> Envelope {
        Envelope {
            rate: [72, 76, 99, 71],
            level: [99, 88, 96, 0],
        }
    }

    #[test]
    fn test_level_30_monotonic() {
        for level in 1..100u8 {
            assert!(level_30(level) >= level_30(level - 1));
        }
        assert_eq!(level_30(99), 0x3F << 24);
        assert_eq!(level_30(0), 0);
    }

    #[test]
    fn test_starts_silent() {
        let eg = TableEnvGen::new();
        assert_eq!(eg.atten12(), ATTEN_12_MAX);
        assert!(eg.is_complete());
    }

    #[test]
    fn test_note_cycle() {
        let mut eg = TableEnvGen::new();
        eg.program(&brass(), 99);

        eg.key_on();
        assert_eq!(eg.phase(), Phase::Attack);

        let mut samples = 0;
        while eg.phase() != Phase::Sustain {
            eg.step();
            samples += 1;
            assert!(samples < 49096 * 10);
        }
        let sustain = eg.atten12();
        assert!(sustain < 0x100, "sustain atten {:#x}", sustain);

        eg.key_off();
        while !eg.is_complete() {
            eg.step();
            samples += 1;
            assert!(samples < 49096 * 20);
        }
        assert_eq!(eg.amplitude(), 0);
        assert_eq!(eg.atten12(), ATTEN_12_MAX);
    }

    #[test]
    fn test_key_on_starts_at_release_level() {
        let mut eg = TableEnvGen::new();
        eg.program(
            &Envelope {
                rate: [72, 76, 99, 71],
                level: [99, 99, 99, 50],
            },
            99,
        );

        eg.key_on();
        assert_eq!(eg.phase(), Phase::Attack);
        assert_eq!(eg.amplitude(), level_30(49));

        // Rising from L4 towards L1 runs at the attack speedup
        eg.step();
        assert_eq!(eg.amplitude(), level_30(49) + rate_30(72) * RISE_SPEEDUP);
    }

    #[test]
    fn test_retrigger_restarts_at_release_level() {
        let envelope = Envelope {
            rate: [90, 90, 90, 50],
            level: [99, 90, 80, 40],
        };
        let mut eg = TableEnvGen::new();
        eg.program(&envelope, 99);

        eg.key_on();
        let mut samples = 0;
        while eg.phase() != Phase::Sustain {
            eg.step();
            samples += 1;
            assert!(samples < 49096 * 10);
        }
        assert_eq!(eg.amplitude(), level_30(79));

        eg.key_on();
        assert_eq!(eg.phase(), Phase::Attack);
        assert_eq!(eg.amplitude(), level_30(39));
    }

    #[test]
    fn test_output_level_scales() {
        let mut loud = TableEnvGen::new();
        let mut quiet = TableEnvGen::new();
        loud.program(&brass(), 99);
        quiet.program(&brass(), 50);

        loud.key_on();
        quiet.key_on();
        for _ in 0..49096 {
            loud.step();
            quiet.step();
        }
        assert!(quiet.atten12() > loud.atten12());
    }
}
