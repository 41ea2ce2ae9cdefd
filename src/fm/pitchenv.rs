//! Pitch envelope generator
//!
//! A four stage envelope that offsets the voice pitch. It is clocked from the
//! firmware control tick but only updates on every other tick, and reports
//! whether it changed so the firmware knows to reload the operator
//! frequencies.

use super::constants::{PITCH_EG_LEVEL, PITCH_EG_RATE};
use super::envelope::Phase;
use super::patch::Envelope;

/// Output value with no pitch deviation
const CENTRE: i32 = 0x4000;

/// Pitch envelope generator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PitchEg {
    rate: [u8; 4],
    level: [u8; 4],

    toggle: bool,
    phase: Phase,
    output: u16,
}

impl Default for PitchEg {
    fn default() -> Self {
        Self::new()
    }
}

impl PitchEg {
    /// Create a pitch envelope resting at the centre
    pub fn new() -> Self {
        Self {
            rate: [0; 4],
            level: [PITCH_EG_LEVEL[50]; 4],
            toggle: false,
            phase: Phase::End,
            output: CENTRE as u16,
        }
    }

    /// Program rates and levels from the patch pitch envelope
    pub fn load(&mut self, envelope: &Envelope) {
        for i in 0..4 {
            self.rate[i] = PITCH_EG_RATE[usize::from(envelope.rate[i].min(99))];
            self.level[i] = PITCH_EG_LEVEL[usize::from(envelope.level[i].min(99))];
        }
    }

    /// Current signed pitch offset, 0x4000 either side of the centre
    pub fn output(&self) -> i32 {
        i32::from(self.output) - CENTRE
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Start of note, jumping to L4
    pub fn key_on(&mut self) {
        self.output = u16::from(self.level[3]) << 7;
        self.phase = Phase::Attack;
    }

    /// Start of release
    pub fn key_off(&mut self) {
        self.phase = Phase::Release;
    }

    /// Control-rate step; returns `true` on the ticks where the output was updated
    pub fn tick(&mut self) -> bool {
        self.toggle = !self.toggle;
        if self.toggle {
            return false;
        }

        if !self.phase.is_moving() {
            return true;
        }

        let stage = self.phase.stage();
        let delta = i32::from(self.rate[stage]);
        let target = i32::from(self.level[stage]) << 7;
        let current = i32::from(self.output);

        if target == current {
            self.phase = self.phase.next();
        } else if target < current {
            let mut next = current - delta;
            if next <= target {
                next = target;
                self.phase = self.phase.next();
            }
            self.output = next as u16;
        } else {
            let mut next = current + delta;
            if next >= target {
                next = target;
                self.phase = self.phase.next();
            }
            self.output = next as u16;
        }

        true
    }
}
